//! Top-level mode state machine

mod controller;
mod mode;

pub use controller::ModeController;
pub use mode::ModeState;
