//! Types exchanged with the aggregation engine and the pure steps that turn
//! its output into a player view.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::heatmap::{deserialize_counts, PositionCounts, PositionData};
use crate::identity::ANONYMOUS_ACCOUNT_ID;
use crate::matches::Match;
use crate::player::{PlayerProfile, ProfileJoin};

/// Teammates sharing fewer games than this are left out of the list
pub const MIN_TEAMMATE_GAMES: u32 = 3;

/// Computes summary statistics over a filtered set of matches.
#[async_trait]
pub trait AggregationEngine: Send + Sync {
    async fn query(&self, query: AdvancedQuery) -> Result<QueryResults>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedQuery {
    pub select: Document,
    pub project: Document,
    /// Aggregations to run; `None` runs every aggregation the engine knows
    pub agg: Option<Vec<String>>,
    pub sort: Document,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResults {
    #[serde(rename = "aggData")]
    pub agg_data: AggData,
    #[serde(default)]
    pub display_matches: Vec<Value>,
    #[serde(default)]
    pub data: Vec<Match>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggData {
    #[serde(default)]
    pub obs: PositionAgg,
    #[serde(default)]
    pub sen: PositionAgg,
    #[serde(default, deserialize_with = "id_keys")]
    pub matchups: BTreeMap<u32, HeroMatchup>,
    #[serde(default, deserialize_with = "id_keys")]
    pub teammates: BTreeMap<u32, Teammate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionAgg {
    #[serde(default, deserialize_with = "deserialize_counts")]
    pub counts: PositionCounts,
}

/// Map keyed by hero or account id. Keys arrive as strings and come out in
/// ascending numeric order, which is the order the engine reports them in.
fn id_keys<'de, D, T>(de: D) -> std::result::Result<BTreeMap<u32, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: BTreeMap<String, T> = Deserialize::deserialize(de)?;
    raw.into_iter()
        .map(|(id, value)| id.parse().map(|id| (id, value)).map_err(D::Error::custom))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroMatchup {
    #[serde(default)]
    pub hero_id: u32,
    #[serde(default)]
    pub games: u32,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teammate {
    #[serde(default)]
    pub account_id: u32,
    #[serde(default)]
    pub games: u32,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProfileJoin for Teammate {
    fn account_id(&self) -> Option<u32> {
        Some(self.account_id)
    }

    fn merge_profile(&mut self, profile: &PlayerProfile) {
        profile.merge_into(&mut self.fields);
    }
}

/// Player page tab that triggered the query
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerTab {
    #[default]
    Index,
    Matches,
    Heroes,
    Teammates,
    Trends,
    #[serde(other)]
    Other,
}

/// Filters a caller may set on top of the default player query.
/// Every field that is set replaces the default for the same key.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct QueryOverrides {
    pub balanced: Option<i32>,
    pub hero_id: Option<u32>,
    pub game_mode: Option<u32>,
    pub lobby_type: Option<u32>,
    pub region: Option<u32>,
    pub patch: Option<u32>,
    pub leaver_status: Option<u32>,
    pub radiant_win: Option<bool>,
}

impl QueryOverrides {
    fn apply(&self, select: &mut Document) {
        if let Some(balanced) = self.balanced {
            select.insert("balanced", balanced);
        }
        if let Some(hero_id) = self.hero_id {
            select.insert("players.hero_id", hero_id as i64);
        }
        if let Some(game_mode) = self.game_mode {
            select.insert("game_mode", game_mode as i64);
        }
        if let Some(lobby_type) = self.lobby_type {
            select.insert("lobby_type", lobby_type as i64);
        }
        if let Some(region) = self.region {
            select.insert("region", region as i64);
        }
        if let Some(patch) = self.patch {
            select.insert("patch", patch as i64);
        }
        if let Some(leaver_status) = self.leaver_status {
            select.insert("players.leaver_status", leaver_status as i64);
        }
        if let Some(radiant_win) = self.radiant_win {
            select.insert("radiant_win", radiant_win);
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct PlayerQueryOptions {
    #[serde(default)]
    pub info: PlayerTab,
    #[serde(default)]
    pub query: QueryOverrides,
}

impl PlayerQueryOptions {
    /// Matches containing the player, balanced only unless overridden
    pub fn select(&self, account_id: u32) -> Document {
        let mut select = doc! {
            "players.account_id": account_id as i64,
            "balanced": 1,
        };
        self.query.apply(&mut select);
        select
    }

    /// Parsed payloads are only fetched for the trends tab
    pub fn project(&self) -> Document {
        let mut project = Document::new();
        if self.info == PlayerTab::Trends {
            project.insert("parsed_data", 1);
        }
        project
    }

    pub fn to_query(&self, account_id: u32) -> AdvancedQuery {
        AdvancedQuery {
            select: self.select(account_id),
            project: self.project(),
            agg: None,
            sort: doc! { "match_id": -1 },
        }
    }
}

/// Fully assembled statistics view for one player
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    #[serde(flatten)]
    pub profile: PlayerProfile,
    #[serde(rename = "aggData")]
    pub agg_data: AggData,
    pub display_matches: Vec<Value>,
    pub matches: Vec<Match>,
    pub obs: PositionCounts,
    pub sen: PositionCounts,
    #[serde(rename = "posData")]
    pub pos_data: Vec<PositionData>,
    pub heroes_arr: Vec<HeroMatchup>,
    pub teammates: Vec<Teammate>,
}

/// Every matchup, most played first. Ties keep engine order.
pub fn hero_list(matchups: &BTreeMap<u32, HeroMatchup>) -> Vec<HeroMatchup> {
    let mut heroes: Vec<HeroMatchup> = matchups
        .iter()
        .map(|(&hero_id, matchup)| HeroMatchup {
            hero_id,
            ..matchup.clone()
        })
        .collect();
    heroes.sort_by(|a, b| b.games.cmp(&a.games));
    heroes
}

/// Teammates worth listing for `account_id`, most shared games first.
/// Drops the anonymous account, the player itself and rare teammates.
pub fn teammate_list(teammates: &BTreeMap<u32, Teammate>, account_id: u32) -> Vec<Teammate> {
    let mut list: Vec<Teammate> = teammates
        .iter()
        .filter(|(&id, tm)| {
            id != ANONYMOUS_ACCOUNT_ID && id != account_id && tm.games >= MIN_TEAMMATE_GAMES
        })
        .map(|(&id, tm)| Teammate {
            account_id: id,
            ..tm.clone()
        })
        .collect();
    list.sort_by(|a, b| b.games.cmp(&a.games));
    list
}
