//! Durable job queue on a Mongo collection.
//!
//! Workers claim `inactive` jobs, update `progress` while running and finish
//! by setting `state` to `complete` or `failed`. Saving a job spawns a
//! watcher that polls the document and turns those changes into events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::error::ErrorKind;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::Mongo;
use crate::error::Result;
use crate::jobs::{Backoff, EnqueuedJob, JobEvent, JobKind, JobQueue, JobSpec, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Inactive,
    Active,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub title: String,
    pub data: Bson,
    pub priority: Priority,
    /// Lower runs first
    pub priority_rank: i32,
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub remove_on_complete: bool,
    pub state: JobState,
    /// Percent done as written by the worker; may be fractional
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn priority_rank(priority: Priority) -> i32 {
    match priority {
        Priority::High => -10,
        Priority::Normal => 0,
    }
}

impl JobDocument {
    fn from_spec(spec: &JobSpec) -> Result<Self> {
        Ok(Self {
            id: ObjectId::new(),
            kind: spec.kind,
            title: spec.title.clone(),
            data: mongodb::bson::to_bson(&spec.payload)?,
            priority: spec.priority,
            priority_rank: priority_rank(spec.priority),
            max_attempts: spec.attempts,
            backoff: spec.backoff,
            remove_on_complete: spec.remove_on_complete,
            state: JobState::Inactive,
            progress: 0.0,
            error: None,
            created_at: Utc::now(),
        })
    }
}

pub struct MongoJobQueue {
    collection: Collection<JobDocument>,
    poll_interval: Duration,
}

impl MongoJobQueue {
    pub fn new(mongo: &Mongo, poll_interval: Duration) -> Self {
        Self {
            collection: mongo.jobs(),
            poll_interval,
        }
    }
}

#[async_trait]
impl JobQueue for MongoJobQueue {
    async fn save(&self, spec: JobSpec) -> Result<EnqueuedJob> {
        let job = JobDocument::from_spec(&spec)?;
        self.collection.insert_one(&job, None).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        spawn_watcher(
            self.collection.clone(),
            job.id,
            job.remove_on_complete,
            self.poll_interval,
            tx,
        );

        Ok(EnqueuedJob {
            id: job.id.to_hex(),
            spec,
            events: rx,
        })
    }
}

/// Consecutive failed polls tolerated before the job is reported failed
const MAX_POLL_FAILURES: u32 = 5;

fn is_undecodable(e: &mongodb::error::Error) -> bool {
    matches!(*e.kind, ErrorKind::BsonDeserialization(_))
}

/// Event to emit after a failed poll, if the watcher should give up.
/// A document that cannot be decoded will not decode on the next poll either.
fn poll_error_event(id: ObjectId, undecodable: bool, failures: u32, err: &str) -> Option<JobEvent> {
    if undecodable || failures >= MAX_POLL_FAILURES {
        Some(JobEvent::Failed(format!("could not read job {}: {}", id, err)))
    } else {
        None
    }
}

fn progress_percent(progress: f64) -> u32 {
    progress.round().clamp(0.0, 100.0) as u32
}

fn spawn_watcher(
    collection: Collection<JobDocument>,
    id: ObjectId,
    remove_on_complete: bool,
    interval: Duration,
    tx: mpsc::UnboundedSender<JobEvent>,
) {
    tokio::task::spawn(async move {
        let mut last_progress = 0;
        let mut failures = 0;
        loop {
            tokio::time::sleep(interval).await;
            if tx.is_closed() {
                break;
            }

            let job = match collection.find_one(doc! { "_id": id }, None).await {
                Ok(job) => {
                    failures = 0;
                    job
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("could not poll job {} ({} in a row): {:?}", id, failures, e);
                    match poll_error_event(id, is_undecodable(&e), failures, &e.to_string()) {
                        Some(event) => {
                            let _ = tx.send(event);
                            break;
                        }
                        None => continue,
                    }
                }
            };

            let event = match job {
                Some(job) => {
                    let progress = progress_percent(job.progress);
                    if progress != last_progress {
                        last_progress = progress;
                        let _ = tx.send(JobEvent::Progress(progress));
                    }
                    terminal_event(&job)
                }
                // workers delete finished jobs that asked for it
                None if remove_on_complete => Some(JobEvent::Completed),
                None => Some(JobEvent::Failed(format!("job {} disappeared", id))),
            };

            if let Some(event) = event {
                let _ = tx.send(event);
                break;
            }
        }
    });
}

fn terminal_event(job: &JobDocument) -> Option<JobEvent> {
    match job.state {
        JobState::Complete => Some(JobEvent::Completed),
        JobState::Failed => Some(JobEvent::Failed(
            job.error
                .clone()
                .unwrap_or_else(|| format!("job {} failed", job.id)),
        )),
        JobState::Inactive | JobState::Active => None,
    }
}
