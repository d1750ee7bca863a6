use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Player profile as stored in the `players` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// 32-bit account id (PK)
    pub account_id: u32,
    /// Summary attributes (name, avatar, last_summaries_update, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl PlayerProfile {
    pub fn new(account_id: u32) -> Self {
        Self {
            account_id,
            attributes: Map::new(),
        }
    }

    /// Copies every profile attribute onto `target`, overwriting on conflict.
    pub fn merge_into(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.attributes {
            if key == "_id" {
                continue;
            }
            target.insert(key.clone(), value.clone());
        }
    }
}

/// A record that can be enriched with the matching player profile
pub trait ProfileJoin {
    fn account_id(&self) -> Option<u32>;
    fn merge_profile(&mut self, profile: &PlayerProfile);
}

/// Player summary as received from the Steam web API
#[derive(Debug, Clone, Deserialize)]
pub struct SteamSummary {
    pub steamid: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// One rating sample for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub account_id: u32,
    #[serde(default)]
    pub match_id: Option<u64>,
    #[serde(default)]
    pub solo_competitive_rank: Option<i32>,
    #[serde(default)]
    pub competitive_rank: Option<i32>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
}
