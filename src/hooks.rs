use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::matches::Match;
use crate::store::DocumentStore;

/// Which ingestion path produced the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Api,
}

/// Refreshes whatever derived state depends on an inbound match.
#[async_trait]
pub trait PlayerCacheUpdater: Send + Sync {
    async fn update(&self, m: &Match, mode: UpdateMode) -> Result<()>;
}

/// Default updater: persists the inbound match record.
pub struct PersistMatchUpdater {
    store: Arc<dyn DocumentStore>,
}

impl PersistMatchUpdater {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PlayerCacheUpdater for PersistMatchUpdater {
    async fn update(&self, m: &Match, mode: UpdateMode) -> Result<()> {
        tracing::debug!("persisting match {} ({:?})", m.match_id, mode);
        self.store.upsert_match(m).await
    }
}
