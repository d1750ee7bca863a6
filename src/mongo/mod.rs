//! MongoDB-backed implementations of the store, cache and job queue.

use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use std::time::Duration;

use crate::config::Mongo as MongoConfig;
use crate::matches::Match;
use crate::player::{PlayerProfile, Rating};

pub mod cache;
pub mod queue;
pub mod store;

pub use cache::{CacheEntry, MongoCache};
pub use queue::{JobDocument, JobState, MongoJobQueue};
pub use store::MongoStore;

#[derive(Clone)]
pub struct Mongo {
    database: Database,
}

impl Mongo {
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = MongoClient::with_uri_str(&config.url)
            .await
            .context("could not create mongodb client")?;
        let database = client.database(&config.database);

        let mongo = Self { database };
        mongo.ensure_indexes().await?;

        Ok(mongo)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        self.matches()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "match_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await
            .context("could not create match index")?;

        self.players()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "account_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await
            .context("could not create player index")?;

        self.ratings()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "account_id": 1, "time": -1 })
                    .build(),
                None,
            )
            .await
            .context("could not create rating index")?;

        // expired cache entries are reaped by mongo; reads also filter on expiry
        self.cache()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expires_at": 1 })
                    .options(IndexOptions::builder().expire_after(Duration::ZERO).build())
                    .build(),
                None,
            )
            .await
            .context("could not create cache expiry index")?;

        self.jobs()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "state": 1, "priority_rank": 1, "created_at": 1 })
                    .build(),
                None,
            )
            .await
            .context("could not create job index")?;

        Ok(())
    }

    pub fn matches(&self) -> Collection<Match> {
        self.database.collection("matches")
    }

    pub fn players(&self) -> Collection<PlayerProfile> {
        self.database.collection("players")
    }

    pub fn ratings(&self) -> Collection<Rating> {
        self.database.collection("ratings")
    }

    pub fn cache(&self) -> Collection<CacheEntry> {
        self.database.collection("cache")
    }

    pub fn jobs(&self) -> Collection<JobDocument> {
        self.database.collection("jobs")
    }
}
