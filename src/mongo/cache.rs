use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Mongo;
use crate::cache::CacheStore;
use crate::error::{Error, Result};

/// One cached value. Mongo's TTL monitor removes it some time after
/// `expires_at`; reads never return it past that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "_id")]
    pub key: String,
    pub value: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

pub struct MongoCache {
    collection: Collection<CacheEntry>,
}

impl MongoCache {
    pub fn new(mongo: &Mongo) -> Self {
        Self {
            collection: mongo.cache(),
        }
    }
}

#[async_trait]
impl CacheStore for MongoCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self
            .collection
            .find_one(doc! { "_id": key, "expires_at": { "$gt": Utc::now() } }, None)
            .await?;
        Ok(entry.map(|e| e.value))
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
        let ttl = TimeDelta::from_std(ttl).map_err(Error::upstream)?;
        let expires_at = Utc::now() + ttl;

        let opts = UpdateOptions::builder().upsert(true).build();
        self.collection
            .update_one(
                doc! { "_id": key },
                doc! { "$set": { "value": value, "expires_at": expires_at } },
                opts,
            )
            .await?;
        Ok(())
    }
}
