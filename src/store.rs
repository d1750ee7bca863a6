use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::matches::Match;
use crate::player::{PlayerProfile, Rating};

/// Persistent collections behind the platform: matches, players, ratings.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_match(&self, match_id: u64) -> Result<Option<Match>>;

    /// Writes `m` over the stored record following [`ParseStatus::merge`].
    ///
    /// [`ParseStatus::merge`]: crate::matches::ParseStatus::merge
    async fn upsert_match(&self, m: &Match) -> Result<()>;

    /// Profiles for the given account ids. Ids without a profile are skipped.
    async fn find_players(&self, account_ids: &[u32]) -> Result<Vec<PlayerProfile>>;

    /// Sets `attributes` on the profile, creating it when missing, and
    /// stamps `last_summaries_update`.
    async fn upsert_player(
        &self,
        account_id: u32,
        attributes: &Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Ratings for an account, newest first
    async fn find_ratings(&self, account_id: u32) -> Result<Vec<Rating>>;
}
