use std::thread;

use anyhow::Result;
use log::debug;
use pulse_runner_rendering::{FrameInput, FrameOutput, HostBackend, Notification, Presentation};

/// Host that drives the session without a window for a fixed number of frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HeadlessBackend {
    frames: u64,
    realtime: bool,
}

impl HeadlessBackend {
    pub(crate) const fn new(frames: u64, realtime: bool) -> Self {
        Self { frames, realtime }
    }
}

impl HostBackend for HeadlessBackend {
    fn run<F>(self, presentation: Presentation, mut update: F) -> Result<()>
    where
        F: FnMut(FrameInput) -> FrameOutput + 'static,
    {
        let frame_time = presentation.frame_time();
        debug!(
            "{}: running {} headless frames at {} fps",
            presentation.window_title, self.frames, presentation.frames_per_second
        );

        for _ in 0..self.frames {
            let output = update(FrameInput {
                dt: frame_time,
                ..FrameInput::default()
            });
            for notification in &output.notifications {
                report(notification);
            }
            if self.realtime {
                thread::sleep(frame_time);
            }
        }
        Ok(())
    }
}

fn report(notification: &Notification) {
    match notification {
        Notification::TrackChanged {
            index,
            track_id,
            reason,
        } => println!("track {index} ({track_id}) {reason:?}"),
        Notification::GameOver { score } => println!("game over with score {score}"),
        Notification::ScoreChanged { score } => debug!("score {score}"),
    }
}
