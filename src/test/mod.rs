//! In-memory collaborators and scenario tests for the ingestion and query
//! paths.

mod sets;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::aggregation::{AdvancedQuery, AggregationEngine, QueryResults};
use crate::cache::CacheStore;
use crate::config::{Environment, Jobs};
use crate::error::{Error, Result};
use crate::hooks::{PlayerCacheUpdater, UpdateMode};
use crate::jobs::{EnqueuedJob, JobEvent, JobProgress, JobQueue, JobSpec};
use crate::matches::{Match, ParseStatus};
use crate::operations::Operations;
use crate::player::{PlayerProfile, Rating};
use crate::queries::Queries;
use crate::render::MatchRenderer;
use crate::store::DocumentStore;

#[derive(Default)]
pub struct MemoryStore {
    pub matches: Mutex<HashMap<u64, Match>>,
    pub players: Mutex<HashMap<u32, PlayerProfile>>,
    pub ratings: Mutex<Vec<Rating>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn with_match(self, m: Match) -> Self {
        self.matches.lock().unwrap().insert(m.match_id, m);
        self
    }

    pub fn with_profile(self, account_id: u32, attributes: Value) -> Self {
        let profile = PlayerProfile {
            account_id,
            attributes: attributes.as_object().cloned().unwrap_or_default(),
        };
        self.players.lock().unwrap().insert(account_id, profile);
        self
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::upstream("store unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_match(&self, match_id: u64) -> Result<Option<Match>> {
        self.check()?;
        Ok(self.matches.lock().unwrap().get(&match_id).cloned())
    }

    async fn upsert_match(&self, m: &Match) -> Result<()> {
        self.check()?;
        let mut matches = self.matches.lock().unwrap();
        let stored = matches
            .get(&m.match_id)
            .map(|s| s.parse_status)
            .unwrap_or_default();
        let mut record = m.clone();
        record.parse_status = ParseStatus::merge(stored, m.parse_status);
        matches.insert(m.match_id, record);
        Ok(())
    }

    async fn find_players(&self, account_ids: &[u32]) -> Result<Vec<PlayerProfile>> {
        self.check()?;
        let players = self.players.lock().unwrap();
        Ok(account_ids
            .iter()
            .filter_map(|id| players.get(id).cloned())
            .collect())
    }

    async fn upsert_player(
        &self,
        account_id: u32,
        attributes: &Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check()?;
        let mut players = self.players.lock().unwrap();
        let profile = players
            .entry(account_id)
            .or_insert_with(|| PlayerProfile::new(account_id));
        for (key, value) in attributes {
            profile.attributes.insert(key.clone(), value.clone());
        }
        profile.attributes.insert(
            "last_summaries_update".to_string(),
            Value::String(updated_at.to_rfc3339()),
        );
        Ok(())
    }

    async fn find_ratings(&self, account_id: u32) -> Result<Vec<Rating>> {
        self.check()?;
        let mut ratings: Vec<Rating> = self
            .ratings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(ratings)
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub writes: Mutex<Vec<(String, Duration, String)>>,
    pub reads: AtomicUsize,
    pub fail_writes: bool,
}

impl MemoryCache {
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn writes(&self) -> Vec<(String, Duration, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
        if self.fail_writes {
            return Err(Error::upstream("cache unavailable"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), ttl, value.clone()));
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Queue that keeps every saved spec and the sending side of its events
#[derive(Default)]
pub struct FakeQueue {
    pub saved: Mutex<Vec<JobSpec>>,
    pub senders: Mutex<Vec<mpsc::UnboundedSender<JobEvent>>>,
}

impl FakeQueue {
    pub fn saved(&self) -> Vec<JobSpec> {
        self.saved.lock().unwrap().clone()
    }

    /// Emits `event` on the most recently saved job
    pub fn emit(&self, event: JobEvent) {
        if let Some(tx) = self.senders.lock().unwrap().last() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl JobQueue for FakeQueue {
    async fn save(&self, spec: JobSpec) -> Result<EnqueuedJob> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut saved = self.saved.lock().unwrap();
        saved.push(spec.clone());
        self.senders.lock().unwrap().push(tx);
        Ok(EnqueuedJob {
            id: saved.len().to_string(),
            spec,
            events: rx,
        })
    }
}

/// Cache-update hook that records calls and can be told to fail
#[derive(Default)]
pub struct FakeUpdater {
    pub calls: Mutex<Vec<u64>>,
    pub fail: bool,
}

#[async_trait]
impl PlayerCacheUpdater for FakeUpdater {
    async fn update(&self, m: &Match, mode: UpdateMode) -> Result<()> {
        assert_eq!(mode, UpdateMode::Api);
        self.calls.lock().unwrap().push(m.match_id);
        if self.fail {
            return Err(Error::upstream("player caches unavailable"));
        }
        Ok(())
    }
}

/// Marks a match as computed and rendered
#[derive(Default)]
pub struct FakeRenderer {
    pub steps: Mutex<Vec<&'static str>>,
}

impl MatchRenderer for FakeRenderer {
    fn compute_match_data(&self, m: &mut Match) {
        self.steps.lock().unwrap().push("compute");
        m.extra.insert("computed".to_string(), Value::Bool(true));
    }

    fn render_match(&self, m: &mut Match) {
        self.steps.lock().unwrap().push("render");
        m.extra.insert("rendered".to_string(), Value::Bool(true));
    }
}

#[derive(Default)]
pub struct FakeEngine {
    pub results: QueryResults,
    pub queries: Mutex<Vec<AdvancedQuery>>,
}

#[async_trait]
impl AggregationEngine for FakeEngine {
    async fn query(&self, query: AdvancedQuery) -> Result<QueryResults> {
        self.queries.lock().unwrap().push(query);
        Ok(self.results.clone())
    }
}

/// Outer job that records every progress report
#[derive(Default)]
pub struct RecordingJob {
    pub reports: Mutex<Vec<(u32, u32, Option<String>)>>,
}

impl RecordingJob {
    pub fn reports(&self) -> Vec<(u32, u32, Option<String>)> {
        self.reports.lock().unwrap().clone()
    }
}

impl JobProgress for RecordingJob {
    fn progress(&self, current: u32, total: u32, message: Option<&str>) {
        self.reports
            .lock()
            .unwrap()
            .push((current, total, message.map(str::to_string)));
    }
}

pub fn operations(
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    queue: Arc<FakeQueue>,
    updater: Arc<FakeUpdater>,
) -> Operations {
    Operations::new(store, cache, queue, updater, Jobs::default())
}

pub fn queries(
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    engine: Arc<FakeEngine>,
    renderer: Arc<FakeRenderer>,
    environment: Environment,
) -> Queries {
    Queries::new(store, cache, engine, renderer, environment)
}

pub fn parse_requested(match_id: u64) -> Match {
    let mut m = Match::new(match_id);
    m.parse_status = ParseStatus::RequestedForParsing;
    m
}
