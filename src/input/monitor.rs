use std::time::Duration;
use tracing::trace;

use crate::hardware::{Button, ButtonPins};

/// Edge of a debounced button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    Released,
}

/// A debounced button edge reported for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub transition: Transition,
}

impl ButtonEvent {
    pub fn pressed(button: Button) -> Self {
        Self {
            button,
            transition: Transition::Pressed,
        }
    }

    pub fn released(button: Button) -> Self {
        Self {
            button,
            transition: Transition::Released,
        }
    }
}

/// Events of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonEvents(Vec<ButtonEvent>);

impl ButtonEvents {
    pub fn new(events: Vec<ButtonEvent>) -> Self {
        Self(events)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ButtonEvent> {
        self.0.iter()
    }

    pub fn was_pressed(&self, button: Button) -> bool {
        self.0.contains(&ButtonEvent::pressed(button))
    }

    pub fn was_released(&self, button: Button) -> bool {
        self.0.contains(&ButtonEvent::released(button))
    }

    /// First button in `order` pressed this tick that passes `accept`.
    ///
    /// Simultaneous presses resolve by position in `order`, not by arrival.
    pub fn first_pressed(
        &self,
        order: &[Button],
        mut accept: impl FnMut(Button) -> bool,
    ) -> Option<Button> {
        order
            .iter()
            .copied()
            .find(|&button| self.was_pressed(button) && accept(button))
    }
}

/// Per-button debounce tracking
#[derive(Debug, Clone, Copy, Default)]
struct Track {
    /// When the pin was first seen low in the current hold
    low_since: Option<Duration>,
    /// Debounced state as last reported
    reported_down: bool,
    last_event: Option<Duration>,
}

/// Polled, debounced reads of the four buttons
pub struct InputMonitor {
    pins: Box<dyn ButtonPins>,
    tracks: [Track; 4],
    settle: Duration,
    debounce: Duration,
}

impl InputMonitor {
    /// `settle`: how long a pin must stay low before it counts as pressed.
    /// `debounce`: minimum spacing between two events of the same button.
    pub fn new(pins: Box<dyn ButtonPins>, settle: Duration, debounce: Duration) -> Self {
        Self {
            pins,
            tracks: [Track::default(); 4],
            settle,
            debounce,
        }
    }

    /// Sample every button and report the edges that became valid at `now`
    pub fn poll(&mut self, now: Duration) -> ButtonEvents {
        let mut events = Vec::new();

        for button in Button::ALL {
            let low = self.pins.is_low(button);
            let track = &mut self.tracks[button.index()];
            let spaced = track
                .last_event
                .map(|at| now.saturating_sub(at) >= self.debounce)
                .unwrap_or(true);

            if low {
                let since = *track.low_since.get_or_insert(now);
                if !track.reported_down && spaced && now.saturating_sub(since) >= self.settle {
                    track.reported_down = true;
                    track.last_event = Some(now);
                    events.push(ButtonEvent::pressed(button));
                }
            } else {
                track.low_since = None;
                if track.reported_down && spaced {
                    track.reported_down = false;
                    track.last_event = Some(now);
                    events.push(ButtonEvent::released(button));
                }
            }
        }

        if !events.is_empty() {
            trace!("Button events at {:?}: {:?}", now, events);
        }
        ButtonEvents::new(events)
    }

    /// Debounced held state as of the last poll
    pub fn is_held(&self, button: Button) -> bool {
        self.tracks[button.index()].reported_down
    }
}
