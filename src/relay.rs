//! Relays an inner parse job's lifecycle onto the outer, user-facing job.
//!
//! The relay starts in [`RelayState::Waiting`] and moves to
//! [`RelayState::Terminated`] on the first terminal event. Anything received
//! after that is discarded. There is no way to cancel the inner job from here.

use tokio::sync::mpsc;

use crate::jobs::{JobEvent, JobProgress};

pub const PROGRESS_TOTAL: u32 = 100;
pub const MSG_UNAVAILABLE: &str = "This replay is unavailable.";
pub const MSG_PARSING: &str = "Parsing replay...";
pub const MSG_COMPLETE: &str = "Parse complete!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(String),
    /// The event channel closed before any terminal event arrived
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Waiting,
    Terminated(Outcome),
}

pub struct ProgressRelay<'a> {
    outer: &'a dyn JobProgress,
    state: RelayState,
}

impl<'a> ProgressRelay<'a> {
    pub fn new(outer: &'a dyn JobProgress) -> Self {
        Self {
            outer,
            state: RelayState::Waiting,
        }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    pub fn handle(&mut self, event: JobEvent) {
        if let RelayState::Terminated(_) = self.state {
            tracing::debug!("discarding {:?} after terminal event", event);
            return;
        }

        match event {
            JobEvent::Progress(percent) => {
                self.outer.progress(percent.min(PROGRESS_TOTAL), PROGRESS_TOTAL, None);
            }
            JobEvent::Failed(err) => {
                self.state = RelayState::Terminated(Outcome::Failed(err));
            }
            JobEvent::Completed => {
                self.outer
                    .progress(PROGRESS_TOTAL, PROGRESS_TOTAL, Some(MSG_COMPLETE));
                self.state = RelayState::Terminated(Outcome::Completed);
            }
        }
    }

    /// Drives the relay until the inner job terminates.
    pub async fn run(mut self, events: &mut mpsc::UnboundedReceiver<JobEvent>) -> Outcome {
        loop {
            if let RelayState::Terminated(outcome) = self.state {
                return outcome;
            }

            match events.recv().await {
                Some(event) => self.handle(event),
                None => self.state = RelayState::Terminated(Outcome::Abandoned),
            }
        }
    }
}
