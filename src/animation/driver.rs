use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::{AnimationDriver, FrameSink};
use crate::error::Result;

/// Control state of a spawned animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationSummary {
    pub frames_emitted: usize,
    pub last_time: Option<i64>,
    /// `true` when the run ended through [`AnimationHandle::stop`] rather
    /// than by passing `max_time`.
    pub stopped: bool,
}

/// Owner-side controls of an animation task.
///
/// Dropping the handle stops the task at its next wait.
pub struct AnimationHandle {
    control: watch::Sender<Playback>,
    task: JoinHandle<Result<AnimationSummary>>,
}

impl AnimationHandle {
    pub fn pause(&self) {
        self.set(Playback::Paused);
    }

    pub fn resume(&self) {
        self.set(Playback::Playing);
    }

    pub fn stop(&self) {
        self.set(Playback::Stopped);
    }

    pub fn state(&self) -> Playback {
        *self.control.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end and returns what it rendered.
    ///
    /// Cancel-safe: dropping the returned future leaves the task running,
    /// and `wait` can be called again until it has returned once.
    pub async fn wait(&mut self) -> Result<AnimationSummary> {
        (&mut self.task).await?
    }

    pub async fn join(mut self) -> Result<AnimationSummary> {
        self.wait().await
    }

    fn set(&self, next: Playback) {
        // Stopped is terminal.
        self.control.send_if_modified(|state| {
            if *state == Playback::Stopped || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

impl AnimationDriver {
    /// Runs the animation on the current tokio runtime, pushing frames to `sink`.
    ///
    /// Must be called from within a runtime.
    pub fn spawn<S>(self, sink: S) -> AnimationHandle
    where
        S: FrameSink + 'static,
    {
        let (control, rx) = watch::channel(Playback::Playing);
        let task = tokio::spawn(run(self, sink, rx));
        AnimationHandle { control, task }
    }
}

async fn run<S: FrameSink>(
    driver: AnimationDriver,
    mut sink: S,
    mut control: watch::Receiver<Playback>,
) -> Result<AnimationSummary> {
    let mut summary = AnimationSummary::default();
    let mut clock = driver.ticks();
    let frame_delay = driver.config().frame_delay;

    info!(
        max_time = ?driver.max_time(),
        time_step = driver.config().time_step,
        trail_length = driver.config().trail_length,
        "Animation started"
    );

    loop {
        if !wait_until_playing(&mut control).await {
            summary.stopped = true;
            break;
        }

        let Some(current_time) = clock.next() else {
            break;
        };

        let frame = driver.frame_at(current_time);
        debug!(current_time, visible = frame.trajectories.len(), "Rendering frame");
        tokio::select! {
            rendered = sink.render(frame) => rendered?,
            _ = stopped(&mut control) => {
                summary.stopped = true;
                break;
            }
        }

        summary.frames_emitted += 1;
        summary.last_time = Some(current_time);

        if clock.is_finished() {
            break;
        }

        if !hold(&mut control, frame_delay).await {
            summary.stopped = true;
            break;
        }
    }

    info!(
        frames = summary.frames_emitted,
        stopped = summary.stopped,
        "Animation finished"
    );
    Ok(summary)
}

/// Blocks while paused. Returns `false` once stopped or the handle is gone.
async fn wait_until_playing(control: &mut watch::Receiver<Playback>) -> bool {
    loop {
        let state = *control.borrow_and_update();
        match state {
            Playback::Playing => return true,
            Playback::Stopped => return false,
            Playback::Paused => {}
        }
        if control.changed().await.is_err() {
            return false;
        }
    }
}

/// Resolves once stopped or the handle is gone.
async fn stopped(control: &mut watch::Receiver<Playback>) {
    loop {
        if *control.borrow_and_update() == Playback::Stopped {
            return;
        }
        if control.changed().await.is_err() {
            return;
        }
    }
}

/// Waits out the frame delay, returning early with `false` on stop.
async fn hold(control: &mut watch::Receiver<Playback>, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return true,
            changed = control.changed() => {
                if changed.is_err() || *control.borrow() == Playback::Stopped {
                    return false;
                }
            }
        }
    }
}
