//! Terminal simulator for running the device on a desktop.
//!
//! The 64x32 panel is drawn with half-block characters (two pixel rows per
//! terminal row). Keys map onto the four buttons:
//!   - `u` / Up arrow    -> Up
//!   - `d` / Down arrow  -> Down
//!   - `s` / Enter       -> Select
//!   - `h`               -> Home (tap)
//!   - space             -> Home held / released (for the arming gesture)
//!   - `q` / Esc / Ctrl-C quit
//!
//! Terminals only report key presses, so a tap holds its button low for a
//! fixed time.

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::cell::RefCell;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::warn;

use super::{Button, ButtonPins, Buzzer, FrameBuffer, Screen, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// How long a tapped key keeps its button held
const TAP_HOLD: Duration = Duration::from_millis(300);

const HELP: &str = "[u]p [d]own [s]elect [h]ome  [space] hold home  [q]uit";

/// Raw mode + alternate screen for the lifetime of the guard
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Default)]
struct KeyState {
    held_until: [Option<Instant>; 4],
    home_latched: bool,
    quit: bool,
}

/// Keyboard-backed buttons, shared with the run loop for the quit request
#[derive(Clone, Default)]
pub struct Keyboard {
    state: Rc<RefCell<KeyState>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.pump();
        self.state.borrow().quit
    }

    pub fn home_latched(&self) -> bool {
        self.state.borrow().home_latched
    }

    /// Drain pending terminal events without blocking
    fn pump(&self) {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.apply(key.code, key.modifiers)
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => break,
                Err(e) => {
                    warn!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
    }

    fn apply(&self, code: KeyCode, modifiers: KeyModifiers) {
        let mut state = self.state.borrow_mut();
        let tap = match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                state.quit = true;
                None
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                state.quit = true;
                None
            }
            KeyCode::Char(' ') => {
                state.home_latched = !state.home_latched;
                None
            }
            KeyCode::Char('u') | KeyCode::Up => Some(Button::Up),
            KeyCode::Char('d') | KeyCode::Down => Some(Button::Down),
            KeyCode::Char('s') | KeyCode::Enter => Some(Button::Select),
            KeyCode::Char('h') => Some(Button::Home),
            _ => None,
        };
        if let Some(button) = tap {
            state.held_until[button.index()] = Some(Instant::now() + TAP_HOLD);
        }
    }
}

impl ButtonPins for Keyboard {
    fn is_low(&mut self, button: Button) -> bool {
        self.pump();
        let state = self.state.borrow();
        let tapped = state.held_until[button.index()]
            .map(|until| Instant::now() < until)
            .unwrap_or(false);
        tapped || (button == Button::Home && state.home_latched)
    }
}

/// Panel rendered to stdout
pub struct TerminalScreen {
    frame: FrameBuffer,
    keyboard: Keyboard,
}

impl TerminalScreen {
    pub fn new(keyboard: Keyboard) -> Self {
        Self {
            frame: FrameBuffer::new(),
            keyboard,
        }
    }

    fn render(&self) -> io::Result<()> {
        let mut out = stdout();
        let border = format!("+{}+", "-".repeat(DISPLAY_WIDTH as usize));

        queue!(out, MoveTo(0, 0), Print(&border))?;
        for row in 0..DISPLAY_HEIGHT / 2 {
            let line: String = (0..DISPLAY_WIDTH)
                .map(|x| {
                    let top = self.frame.is_on(x, row * 2);
                    let bottom = self.frame.is_on(x, row * 2 + 1);
                    match (top, bottom) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect();
            queue!(out, MoveTo(0, row as u16 + 1), Print(format!("|{}|", line)))?;
        }

        let status_row = DISPLAY_HEIGHT as u16 / 2 + 1;
        let home = if self.keyboard.home_latched() {
            "HOME HELD"
        } else {
            ""
        };
        queue!(
            out,
            MoveTo(0, status_row),
            Print(&border),
            MoveTo(0, status_row + 1),
            Clear(ClearType::CurrentLine),
            Print(HELP),
            MoveTo(0, status_row + 2),
            Clear(ClearType::CurrentLine),
            Print(home)
        )?;
        out.flush()
    }
}

impl Screen for TerminalScreen {
    fn fill(&mut self, on: bool) {
        self.frame.fill(on);
    }

    fn pixel(&mut self, x: i32, y: i32, on: bool) {
        self.frame.pixel(x, y, on);
    }

    fn text(&mut self, text: &str, x: i32, y: i32) {
        self.frame.text(text, x, y);
    }

    fn show(&mut self) {
        self.frame.show();
        if let Err(e) = self.render() {
            warn!("Failed to draw frame: {}", e);
        }
    }
}

/// Buzzer mapped onto the terminal bell
pub struct TerminalBuzzer;

impl Buzzer for TerminalBuzzer {
    fn tone(&mut self, _frequency_hz: u32, _duty: u16) {
        let mut out = stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }

    fn silence(&mut self) {}
}
