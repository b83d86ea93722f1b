//! Hardware seams for the handheld.
//!
//! Display, buttons, buzzer, clock and network link are injected into the
//! control loop as trait objects, so every component runs unchanged against
//! the terminal simulator or the simulated rig used by the tests.

pub mod framebuffer;
pub mod sim;
pub mod terminal;

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::NetworkConfig;

pub use framebuffer::{FrameBuffer, TextRun};

/// Panel width in pixels (SSD1306, 64x32)
pub const DISPLAY_WIDTH: u32 = 64;
/// Panel height in pixels
pub const DISPLAY_HEIGHT: u32 = 32;
/// Vertical distance between text lines
pub const LINE_HEIGHT: i32 = 10;

/// The four physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Select,
    Down,
    Home,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Up, Button::Select, Button::Down, Button::Home];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Button::Up => 0,
            Button::Select => 1,
            Button::Down => 2,
            Button::Home => 3,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" => Some(Button::Up),
            "select" => Some(Button::Select),
            "down" => Some(Button::Down),
            "home" => Some(Button::Home),
            _ => None,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Up => "up",
            Button::Select => "select",
            Button::Down => "down",
            Button::Home => "home",
        };
        f.write_str(name)
    }
}

/// Monochrome pixel display
pub trait Screen {
    /// Set every pixel on or off and forget drawn text
    fn fill(&mut self, on: bool);

    fn pixel(&mut self, x: i32, y: i32, on: bool);

    /// Draw a line of text with its top-left corner at (x, y)
    fn text(&mut self, text: &str, x: i32, y: i32);

    /// Push the current frame to the panel
    fn show(&mut self);

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, on: bool) {
        for py in y..y + height {
            for px in x..x + width {
                self.pixel(px, py, on);
            }
        }
    }

    /// Clear the panel and show one line of text per row, from the top
    fn show_lines(&mut self, lines: &[&str]) {
        self.fill(false);
        for (row, line) in lines.iter().enumerate() {
            self.text(line, 0, row as i32 * LINE_HEIGHT);
        }
        self.show();
    }
}

/// First `max_chars` characters of `text`
pub fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Raw button levels. Buttons are wired active-low with pull-ups, so a low
/// pin means the button is held.
pub trait ButtonPins {
    fn is_low(&mut self, button: Button) -> bool;
}

/// Single-frequency PWM buzzer
pub trait Buzzer {
    fn tone(&mut self, frequency_hz: u32, duty: u16);
    fn silence(&mut self);
}

/// Monotonic time source and the only way the device waits
pub trait Clock {
    /// Time elapsed since boot
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

/// Outcome of bringing the network link up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    AlreadyConnected,
    Connected { address: String },
    Failed,
}

/// Network association, owned by the platform
pub trait NetworkLink {
    /// Join the configured network, or report that a link is already up
    fn associate(&mut self, network: &NetworkConfig) -> LinkStatus;
}

/// Everything the control loop drives
pub struct Peripherals {
    pub screen: Box<dyn Screen>,
    pub buttons: Box<dyn ButtonPins>,
    pub buzzer: Box<dyn Buzzer>,
    pub clock: Box<dyn Clock>,
    pub link: Box<dyn NetworkLink>,
}

/// Wall clock backed by `std::thread::sleep`
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.boot.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Host network: the operating system already owns the link
pub struct HostLink;

impl NetworkLink for HostLink {
    fn associate(&mut self, network: &NetworkConfig) -> LinkStatus {
        if !network.ssid.is_empty() {
            debug!("Host manages its own link, not joining {}", network.ssid);
        }
        LinkStatus::AlreadyConnected
    }
}

/// No buttons attached (headless package runs)
pub struct NoButtons;

impl ButtonPins for NoButtons {
    fn is_low(&mut self, _button: Button) -> bool {
        false
    }
}
