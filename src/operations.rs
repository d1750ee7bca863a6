//! Write path: player upserts, the parse decision and job dispatch.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::cache::{requested_match_key, CacheStore, REQUESTED_MATCH_TTL};
use crate::config::Jobs as JobsConfig;
use crate::error::{Error, Result};
use crate::hooks::{PlayerCacheUpdater, UpdateMode};
use crate::identity::convert_64_to_32;
use crate::jobs::{Backoff, EnqueuedJob, JobKind, JobPayload, JobProgress, JobQueue, JobSpec, Priority};
use crate::matches::{Match, ParseStatus};
use crate::player::SteamSummary;
use crate::relay::{Outcome, ProgressRelay, MSG_PARSING, MSG_UNAVAILABLE, PROGRESS_TOTAL};
use crate::store::DocumentStore;

pub struct Operations {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
    queue: Arc<dyn JobQueue>,
    updater: Arc<dyn PlayerCacheUpdater>,
    jobs: JobsConfig,
}

impl Operations {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
        updater: Arc<dyn PlayerCacheUpdater>,
        jobs: JobsConfig,
    ) -> Self {
        Self {
            store,
            cache,
            queue,
            updater,
            jobs,
        }
    }

    /// Upserts a player summary keyed by its 32-bit account id
    pub async fn insert_player(&self, player: SteamSummary) -> Result<u32> {
        let account_id = convert_64_to_32(&player.steamid)?;

        let mut attributes = player.attributes;
        attributes.insert("steamid".to_string(), Value::String(player.steamid));

        self.store
            .upsert_player(account_id, &attributes, Utc::now())
            .await?;
        Ok(account_id)
    }

    /// Refreshes caches for `m`, then queues a parse job if one was asked for.
    ///
    /// Callers opt into parsing only by setting the parse status to
    /// [`ParseStatus::RequestedForParsing`]; `Ok(None)` means the match was
    /// accepted but will not be parsed.
    pub async fn insert_match(&self, m: &Match) -> Result<Option<EnqueuedJob>> {
        self.updater.update(m, UpdateMode::Api).await?;

        if m.parse_status != ParseStatus::RequestedForParsing {
            tracing::debug!("match {} not queued for parse", m.match_id);
            return Ok(None);
        }

        let job = if m.request {
            // a user is waiting: jump the queue, but only try once
            let mut requested = m.clone();
            requested.priority = Some(Priority::High);
            requested.attempts = Some(1);
            self.queue_req(JobKind::Parse, &requested).await?
        } else {
            self.queue_req(JobKind::Parse, m).await?
        };

        Ok(Some(job))
    }

    /// Runs [`insert_match`](Self::insert_match) on behalf of `outer` and
    /// relays the parse job's progress to it until the parse job finishes.
    pub async fn insert_match_progress(&self, m: &Match, outer: &dyn JobProgress) -> Result<()> {
        let mut job = match self.insert_match(m).await? {
            Some(job) => job,
            None => {
                outer.progress(PROGRESS_TOTAL, PROGRESS_TOTAL, Some(MSG_UNAVAILABLE));
                return Ok(());
            }
        };

        outer.progress(0, PROGRESS_TOTAL, Some(MSG_PARSING));

        match ProgressRelay::new(outer).run(&mut job.events).await {
            Outcome::Completed => {
                // best effort once the parse has succeeded
                if let Err(e) = self
                    .cache
                    .set_with_expiry(
                        &requested_match_key(m.match_id),
                        REQUESTED_MATCH_TTL,
                        "1".to_string(),
                    )
                    .await
                {
                    tracing::warn!("could not mark match {} as requested: {:?}", m.match_id, e);
                }
                tracing::info!("parse job {} for match {} complete", job.id, m.match_id);
                Ok(())
            }
            Outcome::Failed(err) => {
                tracing::info!("parse job {} for match {} failed: {}", job.id, m.match_id, err);
                Err(Error::JobFailed(err))
            }
            Outcome::Abandoned => Err(Error::JobFailed(
                "parse job ended without a result".to_string(),
            )),
        }
    }

    pub async fn queue_req<P: JobPayload + Sync>(&self, kind: JobKind, payload: &P) -> Result<EnqueuedJob> {
        let spec = JobSpec::new(kind, payload.title(kind), serde_json::to_value(payload)?)
            .attempts(payload.attempts().unwrap_or(self.jobs.default_attempts))
            .backoff(Backoff::exponential(self.jobs.backoff_delay()))
            .remove_on_complete(true)
            .priority(payload.priority().unwrap_or_default());

        let job = self.queue.save(spec).await?;
        tracing::info!("created job {} ({})", job.id, job.spec.title);
        Ok(job)
    }
}
