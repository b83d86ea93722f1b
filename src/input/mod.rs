mod monitor;

pub use monitor::{ButtonEvent, ButtonEvents, InputMonitor, Transition};
