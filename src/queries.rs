//! Read path: cached match views, player statistics and cached sets.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregation::{hero_list, teammate_list, AggregationEngine, PlayerQueryOptions, PlayerView};
use crate::cache::{
    match_key, CacheStore, BOTS_KEY, MATCH_TTL, RATING_PLAYERS_KEY, TRACKED_PLAYERS_KEY,
    USER_PLAYERS_KEY,
};
use crate::config::Environment;
use crate::error::{Error, Result};
use crate::heatmap::PositionData;
use crate::matches::Match;
use crate::player::{PlayerProfile, ProfileJoin, Rating};
use crate::render::MatchRenderer;
use crate::store::DocumentStore;

/// Bots with more friends than this are full and listed last
pub const BOT_FRIEND_LIMIT: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    #[serde(default)]
    pub friends: f64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Snapshots of the independently refreshed cached sets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sets {
    pub bots: Vec<Bot>,
    pub rating_players: Map<String, Value>,
    pub tracked_players: Map<String, Value>,
    pub user_players: Map<String, Value>,
}

pub struct Queries {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
    aggregation: Arc<dyn AggregationEngine>,
    renderer: Arc<dyn MatchRenderer>,
    environment: Environment,
}

impl Queries {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheStore>,
        aggregation: Arc<dyn AggregationEngine>,
        renderer: Arc<dyn MatchRenderer>,
        environment: Environment,
    ) -> Self {
        Self {
            store,
            cache,
            aggregation,
            renderer,
            environment,
        }
    }

    /// Readies a match for display, from cache when possible
    pub async fn prepare_match(&self, match_id: u64) -> Result<Match> {
        let key = match_key(match_id);

        if let Some(reply) = self.cache.get(&key).await? {
            tracing::debug!("cache hit for match {}", match_id);
            return serde_json::from_str(&reply)
                .map_err(|source| Error::CacheCorruption { key, source });
        }

        tracing::debug!("cache miss for match {}", match_id);
        let mut m = self
            .store
            .find_match(match_id)
            .await?
            .ok_or(Error::MatchNotFound { match_id })?;

        self.fill_player_names(&mut m.players).await?;
        self.renderer.compute_match_data(&mut m);
        self.renderer.render_match(&mut m);

        // unparsed matches render differently once parsed, never cache them
        if m.is_fully_parsed() && !self.environment.is_development() {
            self.cache
                .set_with_expiry(&key, MATCH_TTL, serde_json::to_string(&m)?)
                .await?;
        }

        Ok(m)
    }

    /// Joins stored profiles onto `players` by account id, in place.
    /// Order and length are untouched; records without a profile stay as-is.
    pub async fn fill_player_names<T: ProfileJoin + Send>(&self, players: &mut [T]) -> Result<()> {
        let mut account_ids: Vec<u32> = players.iter().filter_map(|p| p.account_id()).collect();
        if account_ids.is_empty() {
            return Ok(());
        }
        account_ids.sort_unstable();
        account_ids.dedup();

        let profiles: HashMap<u32, PlayerProfile> = self
            .store
            .find_players(&account_ids)
            .await?
            .into_iter()
            .map(|p| (p.account_id, p))
            .collect();

        for player in players.iter_mut() {
            if let Some(profile) = player.account_id().and_then(|id| profiles.get(&id)) {
                player.merge_profile(profile);
            }
        }

        Ok(())
    }

    pub async fn get_rating_data(&self, account_id: u32) -> Result<Vec<Rating>> {
        self.store.find_ratings(account_id).await
    }

    pub async fn get_sets(&self) -> Result<Sets> {
        let (mut bots, rating_players, tracked_players, user_players) = tokio::try_join!(
            self.read_set::<Vec<Bot>>(BOTS_KEY),
            self.read_set::<Map<String, Value>>(RATING_PLAYERS_KEY),
            self.read_set::<Map<String, Value>>(TRACKED_PLAYERS_KEY),
            self.read_set::<Map<String, Value>>(USER_PLAYERS_KEY),
        )?;

        sort_bots(&mut bots);

        Ok(Sets {
            bots,
            rating_players,
            tracked_players,
            user_players,
        })
    }

    async fn read_set<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.cache.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| Error::CacheCorruption {
                key: key.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    /// Builds the statistics view for `player` over the matches selected by
    /// `options`.
    pub async fn fill_player_data(
        &self,
        player: PlayerProfile,
        options: &PlayerQueryOptions,
    ) -> Result<PlayerView> {
        let results = self
            .aggregation
            .query(options.to_query(player.account_id))
            .await?;

        let agg_data = results.agg_data;
        let obs = agg_data.obs.counts.clone();
        let sen = agg_data.sen.counts.clone();
        let pos_data = vec![PositionData::generate(&obs, &sen)];

        let heroes_arr = hero_list(&agg_data.matchups);
        let mut teammates = teammate_list(&agg_data.teammates, player.account_id);

        let started = Instant::now();
        self.fill_player_names(&mut teammates).await?;
        tracing::debug!("teammate lookup took {:?}", started.elapsed());

        Ok(PlayerView {
            profile: player,
            agg_data,
            display_matches: results.display_matches,
            matches: results.data,
            obs,
            sen,
            pos_data,
            heroes_arr,
            teammates,
        })
    }
}

/// Most friends first, but full bots go to the end in their original order.
pub fn sort_bots(bots: &mut [Bot]) {
    bots.sort_by(|a, b| {
        let a_full = a.friends > BOT_FRIEND_LIMIT;
        let b_full = b.friends > BOT_FRIEND_LIMIT;
        match (a_full, b_full) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b.friends.partial_cmp(&a.friends).unwrap_or(Ordering::Equal),
        }
    });
}
