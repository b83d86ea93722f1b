#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

use blinken_deck::animation::AmbientAnimator;
use blinken_deck::config::Config;
use blinken_deck::hardware::sim::{SimButtons, SimBuzzer, SimClock, SimLink, SimScreen};
use blinken_deck::hardware::{Button, LinkStatus, Peripherals};
use blinken_deck::software::{LocalLibrary, MemoryTransport, SoftwareCatalog};
use blinken_deck::state::ModeController;

/// How long a scripted tap keeps its button down
pub const TAP_MS: u64 = 300;

/// When the PIN taps land, as scheduled by `enter_pin`
pub const PIN_TAPS_MS: [u64; 3] = [6000, 7000, 8000];

pub const DOWNLOAD_PIN: [Button; 3] = [Button::Down, Button::Select, Button::Up];
pub const EXECUTE_PIN: [Button; 3] = [Button::Up, Button::Select, Button::Down];

/// A complete device on simulated hardware with virtual time
pub struct Deck {
    pub clock: SimClock,
    pub buttons: SimButtons,
    pub screen: SimScreen,
    pub buzzer: SimBuzzer,
    pub link: SimLink,
    pub transport: MemoryTransport,
    pub controller: ModeController,
    /// Mode after every tick, in order
    pub visited: Vec<&'static str>,
    dir: TempDir,
}

impl Deck {
    pub fn new() -> Self {
        Self::with_link(LinkStatus::AlreadyConnected)
    }

    pub fn with_link(status: LinkStatus) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = SimClock::new();
        let buttons = SimButtons::new(&clock);
        let screen = SimScreen::new();
        let buzzer = SimBuzzer::new();
        let link = SimLink::new(status);
        let transport = MemoryTransport::new();

        let peripherals = Peripherals {
            screen: Box::new(screen.clone()),
            buttons: Box::new(buttons.clone()),
            buzzer: Box::new(buzzer.clone()),
            clock: Box::new(clock.clone()),
            link: Box::new(link.clone()),
        };
        let controller = ModeController::new(
            &Config::default(),
            peripherals,
            SoftwareCatalog::new(Box::new(transport.clone())),
            LocalLibrary::new(dir.path().join("software")),
            AmbientAnimator::seeded(0xB11E),
        );

        Self {
            clock,
            buttons,
            screen,
            buzzer,
            link,
            transport,
            controller,
            visited: Vec::new(),
            dir,
        }
    }

    pub fn software_dir(&self) -> PathBuf {
        self.dir.path().join("software")
    }

    pub fn library(&self) -> LocalLibrary {
        LocalLibrary::new(self.software_dir())
    }

    /// Splash screen; virtual time ends at 2000 ms
    pub fn boot(&mut self) {
        self.controller.boot();
    }

    pub fn tap(&self, button: Button, at_ms: u64) {
        self.buttons.hold(button, at_ms, at_ms + TAP_MS);
    }

    /// Hold Home from 2000 ms to 5500 ms, then tap `pin` at `PIN_TAPS_MS`.
    /// The gesture has resolved by roughly 8500 ms.
    pub fn enter_pin(&self, pin: [Button; 3]) {
        self.buttons.hold(Button::Home, 2000, 5500);
        for (button, at) in pin.into_iter().zip(PIN_TAPS_MS) {
            self.tap(button, at);
        }
    }

    pub fn run_until(&mut self, ms: u64) {
        while self.clock.now_ms() < ms {
            self.controller.tick();
            self.visited.push(self.controller.state().name());
        }
    }

    pub fn visited(&self, mode: &str) -> bool {
        self.visited.iter().any(|name| *name == mode)
    }

    /// True if some shown frame carried exactly these text lines
    pub fn showed(&self, lines: &[&str]) -> bool {
        self.screen.history().iter().any(|frame| frame == lines)
    }
}
