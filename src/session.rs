use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    capture::FrameSource,
    display::{KeyEvent, Surface},
    recorder::SessionRecorder,
    target::{Target, TargetScheduler},
};

/// Loop states. The cue animation lives entirely in the display layer and
/// has no bearing on these transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No active target; ask the scheduler for one.
    WaitingForTarget,
    /// Target displayed, awaiting its confirmation key.
    Armed(Target),
    /// Terminal.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub records: usize,
}

/// Single-threaded collection loop. Owns the camera, the display and the
/// recorder for the run; all three are released by scope on every exit
/// path, normal quit and fatal error alike.
pub struct Session<S, C, D> {
    scheduler: S,
    source: C,
    surface: D,
    recorder: SessionRecorder,
}

impl<S, C, D> Session<S, C, D>
where
    S: TargetScheduler,
    C: FrameSource,
    D: Surface,
{
    pub fn new(scheduler: S, source: C, surface: D, recorder: SessionRecorder) -> Self {
        Session {
            scheduler,
            source,
            surface,
            recorder,
        }
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        let mut state = SessionState::WaitingForTarget;
        loop {
            state = match state {
                SessionState::WaitingForTarget => self.acquire_target()?,
                SessionState::Armed(target) => self.await_confirmation(target)?,
                SessionState::Quit => break,
            };
        }

        info!("session finished with {} records", self.recorder.len());
        Ok(SessionSummary {
            records: self.recorder.len(),
        })
    }

    fn acquire_target(&mut self) -> Result<SessionState> {
        match self.scheduler.next_target() {
            Some(target) => {
                debug!(
                    "armed target at ({}, {}) facing {:?}",
                    target.x, target.y, target.orientation
                );
                self.surface.arm(&target).context("arming display")?;
                Ok(SessionState::Armed(target))
            }
            None => {
                // Sequence exhausted: idle on a blank screen until quit.
                self.surface.render_idle().context("rendering idle screen")?;
                match self.surface.poll_key().context("polling input")? {
                    Some(KeyEvent::Quit) => Ok(SessionState::Quit),
                    _ => Ok(SessionState::WaitingForTarget),
                }
            }
        }
    }

    fn await_confirmation(&mut self, target: Target) -> Result<SessionState> {
        let preview = self.source.read_frame().context("reading preview frame")?;
        self.surface
            .render(&target, Some(&preview))
            .context("rendering stimulus")?;

        match self.surface.poll_key().context("polling input")? {
            Some(KeyEvent::Quit) => Ok(SessionState::Quit),
            Some(KeyEvent::Arrow(direction)) if direction == target.orientation => {
                self.source.flush().context("flushing stale frames")?;
                let frame = self
                    .source
                    .read_frame()
                    .context("reading confirmation frame")?;
                let record = self
                    .recorder
                    .record(&target, &frame)
                    .context("persisting session record")?;
                info!(
                    "recorded {} for target ({}, {})",
                    record.image_filename, target.x, target.y
                );
                // The matching key consumes the target, so a burst of
                // repeated presses cannot record it twice.
                Ok(SessionState::WaitingForTarget)
            }
            // Mismatched arrows and timeouts keep the target armed.
            _ => Ok(SessionState::Armed(target)),
        }
    }
}
