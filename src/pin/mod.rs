//! PIN gate: the arming hold and the timed three-button sequence

mod gate;

pub use gate::{
    Arming, ArmingStep, Capture, CaptureStep, PinAction, PinSequence, Resolution, CAPTURE_ORDER,
    PIN_LENGTH,
};
