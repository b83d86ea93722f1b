//! Simulated hardware for tests and headless runs.
//!
//! Each type is a cheap handle over shared state (`Rc`), so a test keeps one
//! clone to script inputs and inspect outputs while the controller owns the
//! other. Time is virtual: `SimClock::sleep` advances it instantly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::{Button, ButtonPins, Buzzer, Clock, FrameBuffer, LinkStatus, NetworkLink, Screen};
use crate::config::NetworkConfig;

/// Virtual monotonic clock
#[derive(Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<Duration>>,
    slept: Rc<RefCell<Vec<Duration>>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn now_ms(&self) -> u64 {
        self.now.get().as_millis() as u64
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
        self.advance(duration);
    }
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    button: Button,
    from: Duration,
    until: Duration,
}

/// Buttons driven by a timeline of hold intervals on a `SimClock`
#[derive(Clone)]
pub struct SimButtons {
    clock: SimClock,
    holds: Rc<RefCell<Vec<Hold>>>,
}

impl SimButtons {
    pub fn new(clock: &SimClock) -> Self {
        Self {
            clock: clock.clone(),
            holds: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Hold `button` low from `from_ms` until `until_ms` (exclusive)
    pub fn hold(&self, button: Button, from_ms: u64, until_ms: u64) {
        self.holds.borrow_mut().push(Hold {
            button,
            from: Duration::from_millis(from_ms),
            until: Duration::from_millis(until_ms),
        });
    }
}

impl ButtonPins for SimButtons {
    fn is_low(&mut self, button: Button) -> bool {
        let now = self.clock.now();
        self.holds
            .borrow()
            .iter()
            .any(|h| h.button == button && h.from <= now && now < h.until)
    }
}

/// Screen that records the text of every frame it shows
#[derive(Clone, Default)]
pub struct SimScreen {
    frame: Rc<RefCell<FrameBuffer>>,
    shown: Rc<RefCell<Vec<Vec<String>>>>,
}

impl SimScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text lines of every shown frame that carried text, oldest first
    pub fn history(&self) -> Vec<Vec<String>> {
        self.shown
            .borrow()
            .iter()
            .filter(|lines| !lines.is_empty())
            .cloned()
            .collect()
    }

    /// True if any shown frame contained `needle` on one of its lines
    pub fn saw(&self, needle: &str) -> bool {
        self.shown
            .borrow()
            .iter()
            .any(|lines| lines.iter().any(|line| line.contains(needle)))
    }

    pub fn with_frame<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        f(&self.frame.borrow())
    }
}

impl Screen for SimScreen {
    fn fill(&mut self, on: bool) {
        self.frame.borrow_mut().fill(on);
    }

    fn pixel(&mut self, x: i32, y: i32, on: bool) {
        self.frame.borrow_mut().pixel(x, y, on);
    }

    fn text(&mut self, text: &str, x: i32, y: i32) {
        self.frame.borrow_mut().text(text, x, y);
    }

    fn show(&mut self) {
        let mut frame = self.frame.borrow_mut();
        frame.show();
        self.shown.borrow_mut().push(frame.text_lines());
    }
}

/// Buzzer that counts tones
#[derive(Clone, Default)]
pub struct SimBuzzer {
    tones: Rc<Cell<u32>>,
    sounding: Rc<Cell<bool>>,
}

impl SimBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tones(&self) -> u32 {
        self.tones.get()
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding.get()
    }
}

impl Buzzer for SimBuzzer {
    fn tone(&mut self, _frequency_hz: u32, _duty: u16) {
        self.tones.set(self.tones.get() + 1);
        self.sounding.set(true);
    }

    fn silence(&mut self) {
        self.sounding.set(false);
    }
}

/// Network link with a scripted outcome
#[derive(Clone)]
pub struct SimLink {
    status: Rc<RefCell<LinkStatus>>,
    attempts: Rc<Cell<u32>>,
    /// (ssid, password) handed over on each attempt
    credentials: Rc<RefCell<Vec<(String, String)>>>,
}

impl SimLink {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            status: Rc::new(RefCell::new(status)),
            attempts: Rc::new(Cell::new(0)),
            credentials: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    pub fn credentials(&self) -> Vec<(String, String)> {
        self.credentials.borrow().clone()
    }
}

impl NetworkLink for SimLink {
    fn associate(&mut self, network: &NetworkConfig) -> LinkStatus {
        self.attempts.set(self.attempts.get() + 1);
        self.credentials
            .borrow_mut()
            .push((network.ssid.clone(), network.password.clone()));
        self.status.borrow().clone()
    }
}
