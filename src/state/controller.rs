use std::time::Duration;
use tracing::{debug, info, warn};

use super::ModeState;
use crate::animation::AmbientAnimator;
use crate::config::{BuzzerConfig, Config, Delay, NetworkConfig, TimingConfig};
use crate::exec::{Capabilities, Executor};
use crate::hardware::{
    clip, Button, Buzzer, Clock, LinkStatus, NetworkLink, Peripherals, Screen, LINE_HEIGHT,
};
use crate::input::{ButtonEvents, InputMonitor};
use crate::menu::{MenuNavigator, MenuSignal};
use crate::pin::{Arming, ArmingStep, Capture, CaptureStep, PinAction, Resolution};
use crate::software::{LocalLibrary, SoftwareCatalog, SoftwareItem};

/// Characters of a package name shown on status screens
const STATUS_NAME_CHARS: usize = 8;

/// Owns the control loop: one `tick` per iteration, one active mode at a time
pub struct ModeController {
    timing: TimingConfig,
    tone: BuzzerConfig,
    network: NetworkConfig,
    screen: Box<dyn Screen>,
    buzzer: Box<dyn Buzzer>,
    clock: Box<dyn Clock>,
    link: Box<dyn NetworkLink>,
    input: InputMonitor,
    animator: AmbientAnimator,
    catalog: SoftwareCatalog,
    library: LocalLibrary,
    executor: Executor,
    state: ModeState,
}

impl ModeController {
    pub fn new(
        config: &Config,
        peripherals: Peripherals,
        catalog: SoftwareCatalog,
        library: LocalLibrary,
        animator: AmbientAnimator,
    ) -> Self {
        let Peripherals {
            screen,
            buttons,
            buzzer,
            clock,
            link,
        } = peripherals;
        let input = InputMonitor::new(
            buttons,
            config.timing.input_settle(),
            config.timing.input_debounce(),
        );

        Self {
            timing: config.timing.clone(),
            tone: config.buzzer.clone(),
            network: config.network.clone(),
            screen,
            buzzer,
            clock,
            link,
            input,
            animator,
            catalog,
            library,
            executor: Executor::new(config.executor.clone()),
            state: ModeState::Ambient,
        }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn animator(&self) -> &AmbientAnimator {
        &self.animator
    }

    pub fn library(&self) -> &LocalLibrary {
        &self.library
    }

    /// Splash screen and storage setup, once at power-on
    pub fn boot(&mut self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        self.screen.show_lines(&["Software", "Manager", version.as_str()]);
        if let Err(e) = self.library.ensure_dir() {
            warn!(
                "Cannot create software directory {}: {}",
                self.library.dir().display(),
                e
            );
        }
        self.pause(Delay::Splash);
        self.animator.draw(self.screen.as_mut());
        info!("Booted into {}", self.state.name());
    }

    /// One control-loop iteration: read buttons, step the active mode, idle
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let events = self.input.poll(now);

        let from = self.state.name();
        let state = std::mem::replace(&mut self.state, ModeState::Ambient);
        let next = match state {
            ModeState::Ambient => self.step_ambient(now),
            ModeState::Arming(arming) => self.step_arming(arming, now),
            ModeState::PinCapture(capture) => self.step_capture(capture, now, &events),
            ModeState::DownloadMenu(menu) => self.step_menu(menu, &events, PinAction::Download),
            ModeState::ExecuteMenu(menu) => self.step_menu(menu, &events, PinAction::Execute),
            ModeState::Downloading(item) => self.download(item),
            ModeState::Executing(item) => self.execute(item),
        };
        if next.name() != from {
            info!("Mode {} -> {}", from, next.name());
        }

        let idle = if next.is_menu() {
            Delay::MenuPoll
        } else {
            Delay::Tick
        };
        self.state = next;
        self.pause(idle);
    }

    fn step_ambient(&mut self, now: Duration) -> ModeState {
        self.animate();
        if self.input.is_held(Button::Home) {
            debug!("Home held, arming");
            return ModeState::Arming(Arming::start(now));
        }
        ModeState::Ambient
    }

    fn step_arming(&mut self, arming: Arming, now: Duration) -> ModeState {
        let home_held = self.input.is_held(Button::Home);
        match arming.step(now, home_held, self.timing.arming_hold()) {
            ArmingStep::Holding => {
                self.animate();
                ModeState::Arming(arming)
            }
            ArmingStep::Aborted => {
                debug!("Home released after {:?}", arming.held_for(now));
                self.animate();
                ModeState::Ambient
            }
            ArmingStep::Armed => {
                info!("Armed, waiting for PIN");
                self.beep();
                self.animator.set_all_on();
                self.animator.draw(self.screen.as_mut());
                ModeState::PinCapture(Capture::new(self.timing.capture_window()))
            }
        }
    }

    fn step_capture(
        &mut self,
        mut capture: Capture,
        now: Duration,
        events: &ButtonEvents,
    ) -> ModeState {
        let input = &self.input;
        let step = capture.step(now, events, |button| input.is_held(button));
        match step {
            CaptureStep::Waiting | CaptureStep::Opened => {
                self.animator.draw(self.screen.as_mut());
                ModeState::PinCapture(capture)
            }
            CaptureStep::Accepted(button) => {
                debug!("PIN button {} accepted", button);
                self.beep();
                self.pause(Delay::PinDebounce);
                match capture.completed() {
                    Some(resolution) => self.resolve(resolution),
                    None => ModeState::PinCapture(capture),
                }
            }
            CaptureStep::Resolved(resolution) => self.resolve(resolution),
        }
    }

    fn resolve(&mut self, resolution: Resolution) -> ModeState {
        match resolution {
            Resolution::Action(PinAction::Download) => {
                info!("PIN accepted: download");
                self.open_download_menu()
            }
            Resolution::Action(PinAction::Execute) => {
                info!("PIN accepted: execute");
                self.open_execute_menu()
            }
            Resolution::NoMatch => {
                info!("PIN not recognized");
                self.finish_flow()
            }
            Resolution::TimedOut => {
                info!("PIN window timed out");
                self.finish_flow()
            }
        }
    }

    fn open_download_menu(&mut self) -> ModeState {
        if !self.associate() {
            return self.finish_flow();
        }

        self.screen.fill(false);
        self.screen.text("Loading...", 0, LINE_HEIGHT);
        self.screen.show();

        let items = match self.catalog.fetch_list() {
            Ok(items) => items,
            Err(e) => {
                warn!("Catalog listing failed: {}", e);
                self.status(&["Error:", e.summary().as_str()], Delay::StatusDwell);
                Vec::new()
            }
        };

        match MenuNavigator::open("Download:", items) {
            Some(menu) => {
                menu.render(self.screen.as_mut());
                ModeState::DownloadMenu(menu)
            }
            None => {
                self.status(&["No software", "available"], Delay::StatusDwell);
                self.finish_flow()
            }
        }
    }

    fn open_execute_menu(&mut self) -> ModeState {
        let items = self.library.list();
        match MenuNavigator::open("Execute:", items) {
            Some(menu) => {
                menu.render(self.screen.as_mut());
                ModeState::ExecuteMenu(menu)
            }
            None => {
                self.status(&["No software", "installed"], Delay::StatusDwell);
                self.finish_flow()
            }
        }
    }

    /// Bring the network up before talking to the catalog
    fn associate(&mut self) -> bool {
        self.screen.show_lines(&["Connecting", "to WiFi..."]);
        match self.link.associate(&self.network) {
            LinkStatus::AlreadyConnected => {
                self.status(&["Already", "connected"], Delay::LinkNotice);
                true
            }
            LinkStatus::Connected { address } => {
                info!("Network up at {}", address);
                self.status(&["Connected!", address.as_str()], Delay::StatusDwell);
                true
            }
            LinkStatus::Failed => {
                warn!("Network association failed");
                self.status(&["Connection", "failed!"], Delay::StatusDwell);
                false
            }
        }
    }

    fn step_menu(
        &mut self,
        mut menu: MenuNavigator,
        events: &ButtonEvents,
        flow: PinAction,
    ) -> ModeState {
        let Some(signal) = menu.handle(events) else {
            return Self::menu_state(menu, flow);
        };

        self.beep();
        match signal {
            MenuSignal::Moved => {
                menu.render(self.screen.as_mut());
                self.pause(Delay::MenuSettle);
                Self::menu_state(menu, flow)
            }
            MenuSignal::Confirm(_) => {
                let item = menu.selected_item().clone();
                match flow {
                    PinAction::Download => ModeState::Downloading(item),
                    PinAction::Execute => ModeState::Executing(item),
                }
            }
            MenuSignal::Cancel => {
                self.pause(Delay::MenuSettle);
                self.finish_flow()
            }
        }
    }

    fn menu_state(menu: MenuNavigator, flow: PinAction) -> ModeState {
        match flow {
            PinAction::Download => ModeState::DownloadMenu(menu),
            PinAction::Execute => ModeState::ExecuteMenu(menu),
        }
    }

    fn download(&mut self, item: SoftwareItem) -> ModeState {
        self.screen
            .show_lines(&["Downloading", clip(item.name(), STATUS_NAME_CHARS)]);

        match self.catalog.download(&item, &self.library) {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", item, bytes);
                self.status(&["Download", "completed!"], Delay::StatusDwell);
            }
            Err(e) if e.is_status() => {
                warn!("Download of {} refused: {}", item, e);
                self.status(&["Download", "failed!"], Delay::StatusDwell);
            }
            Err(e) => {
                warn!("Download of {} failed: {}", item, e);
                self.status(&["Error:", e.summary().as_str()], Delay::StatusDwell);
            }
        }

        self.pause(Delay::MenuSettle);
        self.finish_flow()
    }

    fn execute(&mut self, item: SoftwareItem) -> ModeState {
        self.screen
            .show_lines(&["Executing", clip(item.name(), STATUS_NAME_CHARS)]);

        let caps = Capabilities::new(self.screen.as_mut(), self.clock.as_mut(), &mut self.input);
        if let Err(e) = self.executor.run(&self.library, &item, caps) {
            self.status(&["Exec Error:", e.summary().as_str()], Delay::ExecErrorDwell);
        }

        self.pause(Delay::MenuSettle);
        self.finish_flow()
    }

    /// Every gated flow ends here: fresh pattern, short pause, back to idle
    fn finish_flow(&mut self) -> ModeState {
        self.animator.reset();
        self.pause(Delay::PostGesture);
        ModeState::Ambient
    }

    fn animate(&mut self) {
        self.animator.update();
        self.animator.draw(self.screen.as_mut());
    }

    fn status(&mut self, lines: &[&str], dwell: Delay) {
        self.screen.show_lines(lines);
        self.pause(dwell);
    }

    fn beep(&mut self) {
        self.buzzer.tone(self.tone.frequency_hz, self.tone.duty);
        self.pause(Delay::Beep);
        self.buzzer.silence();
    }

    fn pause(&mut self, delay: Delay) {
        self.clock.sleep(self.timing.delay(delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{SimButtons, SimBuzzer, SimClock, SimLink, SimScreen};
    use crate::software::{MemoryTransport, Reply};

    struct Rig {
        clock: SimClock,
        buttons: SimButtons,
        screen: SimScreen,
        buzzer: SimBuzzer,
        controller: ModeController,
        _dir: tempfile::TempDir,
    }

    fn rig(transport: &MemoryTransport) -> Rig {
        rig_with(
            transport,
            &Config::default(),
            SimLink::new(LinkStatus::AlreadyConnected),
        )
    }

    fn rig_with(transport: &MemoryTransport, config: &Config, link: SimLink) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let clock = SimClock::new();
        let buttons = SimButtons::new(&clock);
        let screen = SimScreen::new();
        let buzzer = SimBuzzer::new();
        let peripherals = Peripherals {
            screen: Box::new(screen.clone()),
            buttons: Box::new(buttons.clone()),
            buzzer: Box::new(buzzer.clone()),
            clock: Box::new(clock.clone()),
            link: Box::new(link),
        };
        let controller = ModeController::new(
            config,
            peripherals,
            SoftwareCatalog::new(Box::new(transport.clone())),
            LocalLibrary::new(dir.path()),
            AmbientAnimator::seeded(1),
        );
        Rig {
            clock,
            buttons,
            screen,
            buzzer,
            controller,
            _dir: dir,
        }
    }

    impl Rig {
        fn run_until(&mut self, ms: u64) {
            while self.clock.now_ms() < ms {
                self.controller.tick();
            }
        }
    }

    #[test]
    fn test_short_home_press_does_not_arm() {
        let mut rig = rig(&MemoryTransport::new());
        rig.buttons.hold(Button::Home, 100, 1500);

        rig.run_until(1000);
        assert!(matches!(rig.controller.state(), ModeState::Arming(_)));

        rig.run_until(2000);
        assert!(rig.controller.state().is_ambient());
        assert_eq!(rig.buzzer.tones(), 0);
    }

    #[test]
    fn test_long_hold_arms_once() {
        let mut rig = rig(&MemoryTransport::new());
        rig.buttons.hold(Button::Home, 0, 4500);

        rig.run_until(4000);
        assert!(matches!(rig.controller.state(), ModeState::PinCapture(_)));
        assert!(rig.controller.animator().grid().all_on());
        assert_eq!(rig.buzzer.tones(), 1);

        rig.run_until(4400);
        assert_eq!(rig.buzzer.tones(), 1);
        assert!(!rig.buzzer.is_sounding());
    }

    #[test]
    fn test_capture_timeout_returns_to_ambient() {
        let mut rig = rig(&MemoryTransport::new());
        rig.buttons.hold(Button::Home, 0, 3200);
        rig.buttons.hold(Button::Up, 4000, 4100);

        rig.run_until(7000);
        assert!(matches!(rig.controller.state(), ModeState::PinCapture(_)));

        rig.run_until(10_000);
        assert!(rig.controller.state().is_ambient());
        assert!(!rig.controller.animator().grid().all_on());
        // Arming beep plus the one accepted button
        assert_eq!(rig.buzzer.tones(), 2);
    }

    #[test]
    fn test_unknown_pin_is_silent() {
        let mut rig = rig(&MemoryTransport::new());
        rig.buttons.hold(Button::Home, 0, 3200);
        rig.buttons.hold(Button::Select, 4000, 4100);
        rig.buttons.hold(Button::Up, 5000, 5100);
        rig.buttons.hold(Button::Down, 6000, 6100);

        rig.run_until(7000);
        assert!(rig.controller.state().is_ambient());
        assert!(rig.screen.history().is_empty());
    }

    #[test]
    fn test_link_gets_configured_credentials() {
        let mut config = Config::default();
        config.network.ssid = "workshop".to_string();
        config.network.password = "hunter22".to_string();
        let link = SimLink::new(LinkStatus::Failed);

        let mut rig = rig_with(&MemoryTransport::new(), &config, link.clone());
        rig.buttons.hold(Button::Home, 0, 3200);
        rig.buttons.hold(Button::Down, 4000, 4100);
        rig.buttons.hold(Button::Select, 5000, 5100);
        rig.buttons.hold(Button::Up, 6000, 6100);

        rig.run_until(10_000);
        assert_eq!(
            link.credentials(),
            vec![("workshop".to_string(), "hunter22".to_string())]
        );
        assert!(rig.controller.state().is_ambient());
    }
}
