use std::time::Duration;
use tracing::debug;

use crate::hardware::Button;
use crate::input::ButtonEvents;

/// Order in which simultaneous presses are considered during capture
pub const CAPTURE_ORDER: [Button; 3] = [Button::Down, Button::Select, Button::Up];

/// Length of a complete PIN
pub const PIN_LENGTH: usize = 3;

const DOWNLOAD_PIN: [Button; PIN_LENGTH] = [Button::Down, Button::Select, Button::Up];
const EXECUTE_PIN: [Button; PIN_LENGTH] = [Button::Up, Button::Select, Button::Down];

/// What a recognized PIN unlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAction {
    Download,
    Execute,
}

/// How a capture window ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Action(PinAction),
    /// Three distinct buttons that do not form a known PIN
    NoMatch,
    /// The window closed before three buttons were collected
    TimedOut,
}

/// Up to three distinct buttons, in the order they were entered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSequence {
    buttons: Vec<Button>,
}

impl PinSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `button` unless it is already present, Home, or the sequence
    /// is full. Returns whether it was appended.
    pub fn push(&mut self, button: Button) -> bool {
        if button == Button::Home || self.is_complete() || self.contains(button) {
            return false;
        }
        self.buttons.push(button);
        true
    }

    pub fn contains(&self, button: Button) -> bool {
        self.buttons.contains(&button)
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.buttons.len() == PIN_LENGTH
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Only a complete sequence resolves
    pub fn resolve(&self) -> Option<Resolution> {
        if !self.is_complete() {
            return None;
        }
        let resolution = if self.buttons == DOWNLOAD_PIN {
            Resolution::Action(PinAction::Download)
        } else if self.buttons == EXECUTE_PIN {
            Resolution::Action(PinAction::Execute)
        } else {
            Resolution::NoMatch
        };
        Some(resolution)
    }
}

/// Outcome of one arming tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingStep {
    Holding,
    /// Home let go before the threshold
    Aborted,
    Armed,
}

/// Home held, timer running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arming {
    since: Duration,
}

impl Arming {
    pub fn start(now: Duration) -> Self {
        Self { since: now }
    }

    pub fn held_for(&self, now: Duration) -> Duration {
        now.saturating_sub(self.since)
    }

    pub fn step(&self, now: Duration, home_held: bool, threshold: Duration) -> ArmingStep {
        if !home_held {
            ArmingStep::Aborted
        } else if self.held_for(now) >= threshold {
            ArmingStep::Armed
        } else {
            ArmingStep::Holding
        }
    }
}

/// Outcome of one capture tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    /// Nothing happened this tick
    Waiting,
    /// Home was released and the window started
    Opened,
    /// A new button joined the sequence
    Accepted(Button),
    Resolved(Resolution),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Armed, still waiting for the Home release that ends the hold
    AwaitingRelease,
    Open { opened_at: Duration },
}

/// PIN capture window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    phase: Phase,
    sequence: PinSequence,
    window: Duration,
}

impl Capture {
    pub fn new(window: Duration) -> Self {
        Self {
            phase: Phase::AwaitingRelease,
            sequence: PinSequence::new(),
            window,
        }
    }

    pub fn sequence(&self) -> &PinSequence {
        &self.sequence
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Open { .. })
    }

    /// Advance the window. `held` reports the debounced level of each button,
    /// so a PIN button already down when the window opens still counts.
    pub fn step(
        &mut self,
        now: Duration,
        events: &ButtonEvents,
        held: impl Fn(Button) -> bool,
    ) -> CaptureStep {
        let opened_at = match self.phase {
            Phase::AwaitingRelease => {
                if held(Button::Home) {
                    return CaptureStep::Waiting;
                }
                self.phase = Phase::Open { opened_at: now };
                debug!("PIN window open for {:?}", self.window);
                return match self.accept(events, &held) {
                    Some(button) => CaptureStep::Accepted(button),
                    None => CaptureStep::Opened,
                };
            }
            Phase::Open { opened_at } => opened_at,
        };

        if now.saturating_sub(opened_at) >= self.window {
            debug!("PIN window closed after {} button(s)", self.sequence.len());
            return CaptureStep::Resolved(Resolution::TimedOut);
        }
        match self.accept(events, &held) {
            Some(button) => CaptureStep::Accepted(button),
            None => CaptureStep::Waiting,
        }
    }

    /// Take the first new button, in capture order, that was pressed this
    /// tick or is still down
    fn accept(&mut self, events: &ButtonEvents, held: &impl Fn(Button) -> bool) -> Option<Button> {
        let sequence = &self.sequence;
        let button = CAPTURE_ORDER
            .into_iter()
            .find(|&b| (events.was_pressed(b) || held(b)) && !sequence.contains(b))?;
        self.sequence.push(button);
        Some(button)
    }

    /// Resolution once the third button is in
    pub fn completed(&self) -> Option<Resolution> {
        self.sequence.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonEvent;

    fn sequence(buttons: &[Button]) -> PinSequence {
        let mut seq = PinSequence::new();
        for &b in buttons {
            seq.push(b);
        }
        seq
    }

    fn press(button: Button) -> ButtonEvents {
        ButtonEvents::new(vec![ButtonEvent::pressed(button)])
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn nothing_held(_: Button) -> bool {
        false
    }

    fn home_down(button: Button) -> bool {
        button == Button::Home
    }

    #[test]
    fn test_known_pins_resolve() {
        use Button::*;
        assert_eq!(
            sequence(&[Down, Select, Up]).resolve(),
            Some(Resolution::Action(PinAction::Download))
        );
        assert_eq!(
            sequence(&[Up, Select, Down]).resolve(),
            Some(Resolution::Action(PinAction::Execute))
        );
    }

    #[test]
    fn test_other_permutations_do_not_match() {
        use Button::*;
        let others = [
            [Up, Down, Select],
            [Down, Up, Select],
            [Select, Up, Down],
            [Select, Down, Up],
        ];
        for pin in others {
            assert_eq!(sequence(&pin).resolve(), Some(Resolution::NoMatch));
        }
    }

    #[test]
    fn test_partial_sequence_does_not_resolve() {
        assert_eq!(sequence(&[Button::Down, Button::Select]).resolve(), None);
    }

    #[test]
    fn test_duplicates_and_home_are_rejected() {
        let mut seq = PinSequence::new();
        assert!(seq.push(Button::Up));
        assert!(!seq.push(Button::Up));
        assert!(!seq.push(Button::Home));
        assert!(seq.push(Button::Select));
        assert!(!seq.push(Button::Select));
        assert!(seq.push(Button::Down));
        assert!(!seq.push(Button::Down));
        assert_eq!(seq.buttons(), &[Button::Up, Button::Select, Button::Down]);
    }

    #[test]
    fn test_arming_needs_full_hold() {
        let threshold = ms(3000);
        let arming = Arming::start(ms(1000));

        assert_eq!(arming.step(ms(2000), true, threshold), ArmingStep::Holding);
        assert_eq!(arming.step(ms(3999), true, threshold), ArmingStep::Holding);
        assert_eq!(arming.step(ms(4000), true, threshold), ArmingStep::Armed);
        assert_eq!(arming.step(ms(2500), false, threshold), ArmingStep::Aborted);
    }

    #[test]
    fn test_window_opens_on_home_release() {
        let mut capture = Capture::new(ms(5000));
        let none = ButtonEvents::default();

        assert_eq!(capture.step(ms(0), &press(Button::Down), home_down), CaptureStep::Waiting);
        assert!(capture.sequence().is_empty());
        assert_eq!(capture.step(ms(50), &none, nothing_held), CaptureStep::Opened);
        assert!(capture.is_open());
    }

    #[test]
    fn test_capture_collects_distinct_buttons() {
        let mut capture = Capture::new(ms(5000));
        let none = ButtonEvents::default();
        capture.step(ms(0), &none, nothing_held);

        assert_eq!(
            capture.step(ms(100), &press(Button::Down), nothing_held),
            CaptureStep::Accepted(Button::Down)
        );
        assert_eq!(capture.step(ms(600), &press(Button::Down), nothing_held), CaptureStep::Waiting);
        assert_eq!(
            capture.step(ms(1100), &press(Button::Select), nothing_held),
            CaptureStep::Accepted(Button::Select)
        );
        assert_eq!(capture.completed(), None);
        assert_eq!(
            capture.step(ms(1600), &press(Button::Up), nothing_held),
            CaptureStep::Accepted(Button::Up)
        );
        assert_eq!(
            capture.completed(),
            Some(Resolution::Action(PinAction::Download))
        );
    }

    #[test]
    fn test_simultaneous_presses_follow_capture_order() {
        let mut capture = Capture::new(ms(5000));
        capture.step(ms(0), &ButtonEvents::default(), nothing_held);

        let all = ButtonEvents::new(vec![
            ButtonEvent::pressed(Button::Up),
            ButtonEvent::pressed(Button::Select),
            ButtonEvent::pressed(Button::Down),
        ]);
        assert_eq!(capture.step(ms(10), &all, nothing_held), CaptureStep::Accepted(Button::Down));
        assert_eq!(capture.step(ms(20), &all, nothing_held), CaptureStep::Accepted(Button::Select));
        assert_eq!(capture.step(ms(30), &all, nothing_held), CaptureStep::Accepted(Button::Up));
    }

    #[test]
    fn test_window_times_out_with_partial_progress() {
        let mut capture = Capture::new(ms(5000));
        capture.step(ms(1000), &ButtonEvents::default(), nothing_held);
        capture.step(ms(2000), &press(Button::Up), nothing_held);
        capture.step(ms(3000), &press(Button::Select), nothing_held);

        assert_eq!(
            capture.step(ms(6000), &press(Button::Down), nothing_held),
            CaptureStep::Resolved(Resolution::TimedOut)
        );
        assert_eq!(capture.sequence().len(), 2);
    }

    #[test]
    fn test_button_down_when_window_opens_is_taken() {
        let mut capture = Capture::new(ms(5000));
        let none = ButtonEvents::default();

        // Down went down while Home was still held; its edge is already spent
        let home_and_down = |b: Button| b == Button::Home || b == Button::Down;
        assert_eq!(
            capture.step(ms(0), &press(Button::Down), home_and_down),
            CaptureStep::Waiting
        );
        assert_eq!(
            capture.step(ms(50), &none, |b| b == Button::Down),
            CaptureStep::Accepted(Button::Down)
        );
        assert!(capture.is_open());

        // Still held on the next tick, but already in the sequence
        assert_eq!(capture.step(ms(100), &none, |b| b == Button::Down), CaptureStep::Waiting);
        assert_eq!(capture.sequence().buttons(), &[Button::Down]);
    }

    #[test]
    fn test_press_on_the_opening_tick_is_taken() {
        let mut capture = Capture::new(ms(5000));
        assert_eq!(
            capture.step(ms(0), &press(Button::Select), nothing_held),
            CaptureStep::Accepted(Button::Select)
        );
    }
}
