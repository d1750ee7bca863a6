use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneOptions, FindOptions, UpdateOptions};
use mongodb::Collection;
use serde_json::{Map, Value};

use super::Mongo;
use crate::error::Result;
use crate::matches::Match;
use crate::player::{PlayerProfile, Rating};
use crate::store::DocumentStore;

pub struct MongoStore {
    mongo: Mongo,
}

impl MongoStore {
    pub fn new(mongo: Mongo) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_match(&self, match_id: u64) -> Result<Option<Match>> {
        get_match(self.mongo.matches(), match_id).await
    }

    async fn upsert_match(&self, m: &Match) -> Result<()> {
        upsert_match(self.mongo.matches(), m).await
    }

    async fn find_players(&self, account_ids: &[u32]) -> Result<Vec<PlayerProfile>> {
        get_players_by_account_ids(self.mongo.players(), account_ids).await
    }

    async fn upsert_player(
        &self,
        account_id: u32,
        attributes: &Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        upsert_player(self.mongo.players(), account_id, attributes, updated_at).await
    }

    async fn find_ratings(&self, account_id: u32) -> Result<Vec<Rating>> {
        get_ratings(self.mongo.ratings(), account_id).await
    }
}

pub async fn get_match(collection: Collection<Match>, match_id: u64) -> Result<Option<Match>> {
    let opts = FindOneOptions::builder().projection(doc! { "_id": 0 }).build();
    let found = collection
        .find_one(doc! { "match_id": match_id as i64 }, opts)
        .await?;
    Ok(found)
}

/// `$set` document for a match upsert. An undecided parse status is left
/// out so it never clears a decision already stored.
pub fn match_update_document(m: &Match) -> Result<Document> {
    let mut set = mongodb::bson::to_document(m)?;
    if m.parse_status.is_undecided() {
        set.remove("parse_status");
    }
    set.remove("match_id");
    Ok(set)
}

pub async fn upsert_match(collection: Collection<Match>, m: &Match) -> Result<()> {
    let set = match_update_document(m)?;
    let opts = UpdateOptions::builder().upsert(true).build();
    collection
        .update_one(
            doc! { "match_id": m.match_id as i64 },
            doc! {
                "$set": set,
                "$setOnInsert": { "match_id": m.match_id as i64 },
            },
            opts,
        )
        .await?;
    Ok(())
}

pub async fn get_players_by_account_ids(
    collection: Collection<PlayerProfile>,
    account_ids: &[u32],
) -> Result<Vec<PlayerProfile>> {
    let ids: Vec<i64> = account_ids.iter().map(|&id| id as i64).collect();
    let opts = FindOptions::builder().projection(doc! { "_id": 0 }).build();

    let players = collection
        .find(doc! { "account_id": { "$in": ids } }, opts)
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(players)
}

pub async fn upsert_player(
    collection: Collection<PlayerProfile>,
    account_id: u32,
    attributes: &Map<String, Value>,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    let mut set = mongodb::bson::to_document(attributes)?;
    set.remove("account_id");
    set.insert("last_summaries_update", updated_at);

    let opts = UpdateOptions::builder().upsert(true).build();
    collection
        .update_one(
            doc! { "account_id": account_id as i64 },
            doc! {
                "$set": set,
                "$setOnInsert": { "account_id": account_id as i64 },
            },
            opts,
        )
        .await?;
    Ok(())
}

pub async fn get_ratings(collection: Collection<Rating>, account_id: u32) -> Result<Vec<Rating>> {
    let opts = FindOptions::builder().sort(doc! { "time": -1 }).build();

    let ratings = collection
        .find(doc! { "account_id": account_id as i64 }, opts)
        .await?
        .try_collect::<Vec<_>>()
        .await?;

    Ok(ratings)
}
