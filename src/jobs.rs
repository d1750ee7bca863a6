//! Job queue surface: job descriptions, lifecycle events and the traits the
//! queue service and in-flight jobs implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Parse,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Parse => "parse",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub delay_secs: u64,
    #[serde(rename = "type")]
    pub kind: BackoffKind,
}

impl Backoff {
    pub fn exponential(delay: Duration) -> Self {
        Self {
            delay_secs: delay.as_secs(),
            kind: BackoffKind::Exponential,
        }
    }
}

/// A job as handed to the queue. Built fluently, then saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub title: String,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub backoff: Backoff,
    pub remove_on_complete: bool,
    pub priority: Priority,
}

impl JobSpec {
    pub fn new(kind: JobKind, title: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            title: title.into(),
            payload,
            attempts: 1,
            backoff: Backoff::exponential(Duration::from_secs(60)),
            remove_on_complete: false,
            priority: Priority::Normal,
        }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn remove_on_complete(mut self, remove: bool) -> Self {
        self.remove_on_complete = remove;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Lifecycle notification emitted by a queued job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Progress(u32),
    Failed(String),
    Completed,
}

/// Handle to a saved job. Owns the receiving side of its event channel.
#[derive(Debug)]
pub struct EnqueuedJob {
    pub id: String,
    pub spec: JobSpec,
    pub events: mpsc::UnboundedReceiver<JobEvent>,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn save(&self, spec: JobSpec) -> Result<EnqueuedJob>;
}

/// An in-flight job reporting its own status.
pub trait JobProgress: Send + Sync {
    fn progress(&self, current: u32, total: u32, message: Option<&str>);
}

/// Something that can be queued; carries its own scheduling hints.
pub trait JobPayload: Serialize {
    fn title(&self, kind: JobKind) -> String;

    fn attempts(&self) -> Option<u32> {
        None
    }

    fn priority(&self) -> Option<Priority> {
        None
    }
}
