//! Key-value cache surface and the key layout used on top of it.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Rendered matches stay cached for an hour
pub const MATCH_TTL: Duration = Duration::from_secs(60 * 60);
/// Marker for matches a user asked to parse recently
pub const REQUESTED_MATCH_TTL: Duration = Duration::from_secs(60 * 60 * 24);

pub const BOTS_KEY: &str = "bots";
pub const RATING_PLAYERS_KEY: &str = "ratingPlayers";
pub const TRACKED_PLAYERS_KEY: &str = "trackedPlayers";
pub const USER_PLAYERS_KEY: &str = "userPlayers";

pub fn match_key(match_id: u64) -> String {
    format!("match:{}", match_id)
}

pub fn requested_match_key(match_id: u64) -> String {
    format!("requested_match:{}", match_id)
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Serialized value stored at `key`, if present and not expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: String) -> Result<()>;
}
