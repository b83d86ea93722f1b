use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::script::{self, Op, ScriptError};
use crate::config::ExecutorConfig;
use crate::hardware::{clip, Button, Clock, Screen, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::input::InputMonitor;
use crate::software::{LocalLibrary, SoftwareItem, SUMMARY_CHARS};

/// Poll interval while a package waits for a button
const AWAIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Load: {0}")]
    Load(#[source] std::io::Error),

    #[error("Not UTF-8")]
    Encoding,

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Step limit {0}")]
    StepLimit(u64),

    #[error("Wait limit {0}ms")]
    WaitLimit(u64),

    #[error("Crashed: {0}")]
    Panicked(String),
}

impl ExecError {
    pub fn summary(&self) -> String {
        clip(&self.to_string(), SUMMARY_CHARS).to_string()
    }
}

/// Everything a package is allowed to touch: the display, bounded waits and
/// read-only button state. No network, no storage.
pub struct Capabilities<'a> {
    screen: &'a mut dyn Screen,
    clock: &'a mut dyn Clock,
    input: &'a mut InputMonitor,
}

impl<'a> Capabilities<'a> {
    pub fn new(
        screen: &'a mut dyn Screen,
        clock: &'a mut dyn Clock,
        input: &'a mut InputMonitor,
    ) -> Self {
        Self {
            screen,
            clock,
            input,
        }
    }
}

/// What a finished run used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: u64,
    pub waited: Duration,
    pub frames: u64,
}

/// Runs installed packages against a `Capabilities` value
#[derive(Debug, Clone)]
pub struct Executor {
    limits: ExecutorConfig,
}

impl Executor {
    pub fn new(limits: ExecutorConfig) -> Self {
        Self { limits }
    }

    /// Load `item` from `library` and run it to completion
    pub fn run(
        &self,
        library: &LocalLibrary,
        item: &SoftwareItem,
        caps: Capabilities<'_>,
    ) -> Result<RunReport, ExecError> {
        let bytes = library.read(item).map_err(ExecError::Load)?;
        let source = String::from_utf8(bytes).map_err(|_| ExecError::Encoding)?;
        info!("Running {}", item);

        let result = self.run_source(&source, caps);
        match &result {
            Ok(report) => info!(
                "{} finished: {} steps, {:?} waiting, {} frames",
                item, report.steps, report.waited, report.frames
            ),
            Err(e) => warn!("{} failed: {}", item, e),
        }
        result
    }

    /// Parse and run package source. Panics inside the interpreter are
    /// reported as `ExecError::Panicked` instead of unwinding further.
    pub fn run_source(&self, source: &str, caps: Capabilities<'_>) -> Result<RunReport, ExecError> {
        let script = script::parse(source)?;
        debug!("Parsed {} top-level command(s)", script.ops.len());

        let mut machine = Machine {
            caps,
            limits: &self.limits,
            report: RunReport::default(),
        };
        match panic::catch_unwind(AssertUnwindSafe(|| machine.block(&script.ops))) {
            Ok(result) => result.map(|_| machine.report),
            Err(payload) => Err(ExecError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

struct Machine<'a, 'c> {
    caps: Capabilities<'c>,
    limits: &'a ExecutorConfig,
    report: RunReport,
}

impl Machine<'_, '_> {
    fn block(&mut self, ops: &[Op]) -> Result<(), ExecError> {
        for op in ops {
            self.step()?;
            match op {
                Op::Fill(on) => self.caps.screen.fill(*on),
                Op::Pixel { x, y, on } => self.caps.screen.pixel(*x, *y, *on),
                Op::Rect {
                    x,
                    y,
                    width,
                    height,
                    filled,
                } => self.rect(*x, *y, *width, *height, *filled),
                Op::Text { x, y, text } => self.caps.screen.text(text, *x, *y),
                Op::Show => {
                    self.caps.screen.show();
                    self.report.frames += 1;
                }
                Op::Wait(ms) => self.sleep(Duration::from_millis(*ms))?,
                Op::Await { button, timeout_ms } => {
                    self.await_button(*button, timeout_ms.map(Duration::from_millis))?
                }
                Op::Repeat { count, body } => {
                    // Each pass costs a step, so an empty body still runs out
                    for _ in 0..*count {
                        self.step()?;
                        self.block(body)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), ExecError> {
        if self.report.steps >= self.limits.max_steps {
            return Err(ExecError::StepLimit(self.limits.max_steps));
        }
        self.report.steps += 1;
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) -> Result<(), ExecError> {
        let budget = Duration::from_millis(self.limits.max_wait_ms);
        if self.report.waited + duration > budget {
            return Err(ExecError::WaitLimit(self.limits.max_wait_ms));
        }
        self.caps.clock.sleep(duration);
        self.report.waited += duration;
        Ok(())
    }

    /// Block until `button` is pressed or `timeout` passes
    fn await_button(&mut self, button: Button, timeout: Option<Duration>) -> Result<(), ExecError> {
        let started = self.caps.clock.now();
        loop {
            let now = self.caps.clock.now();
            if self.caps.input.poll(now).was_pressed(button) {
                return Ok(());
            }
            if timeout.is_some_and(|limit| now.saturating_sub(started) >= limit) {
                return Ok(());
            }
            self.sleep(AWAIT_POLL)?;
        }
    }

    /// Outline or filled rectangle, clipped to the panel
    fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, filled: bool) {
        if width == 0 || height == 0 {
            return;
        }
        let right = x.saturating_add(width - 1);
        let bottom = y.saturating_add(height - 1);
        let xs = x.max(0)..=right.min(DISPLAY_WIDTH as i32 - 1);
        let ys = y.max(0)..=bottom.min(DISPLAY_HEIGHT as i32 - 1);

        let screen = &mut *self.caps.screen;
        for py in ys {
            for px in xs.clone() {
                let edge = px == x || px == right || py == y || py == bottom;
                if filled || edge {
                    screen.pixel(px, py, true);
                }
            }
        }
    }
}
