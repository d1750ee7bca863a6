use chrono::TimeZone;
use serde_json::json;
use std::sync::Arc;

use super::*;
use crate::cache::{BOTS_KEY, TRACKED_PLAYERS_KEY, USER_PLAYERS_KEY};

fn queries_with(store: MemoryStore, cache: Arc<MemoryCache>) -> Queries {
    queries(
        Arc::new(store),
        cache,
        Arc::new(FakeEngine::default()),
        Arc::new(FakeRenderer::default()),
        Environment::Production,
    )
}

#[tokio::test]
async fn sets_default_when_absent() {
    let cache = Arc::new(MemoryCache::default());
    let q = queries_with(MemoryStore::default(), cache.clone());

    let sets = q.get_sets().await.unwrap();

    assert!(sets.bots.is_empty());
    assert!(sets.rating_players.is_empty());
    assert!(sets.tracked_players.is_empty());
    assert!(sets.user_players.is_empty());
    assert_eq!(cache.reads.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn sets_are_decoded_and_bots_sorted() {
    let bots = json!([
        { "steamid": "a", "friends": 120 },
        { "steamid": "b", "friends": 20 },
        { "steamid": "c", "friends": 80 },
        { "steamid": "d", "friends": 200 },
    ]);
    let cache = Arc::new(
        MemoryCache::default()
            .with_entry(BOTS_KEY, &bots.to_string())
            .with_entry(TRACKED_PLAYERS_KEY, r#"{"88":true}"#)
            .with_entry(USER_PLAYERS_KEY, r#"{"99":true}"#),
    );
    let q = queries_with(MemoryStore::default(), cache);

    let sets = q.get_sets().await.unwrap();

    let order: Vec<&str> = sets
        .bots
        .iter()
        .map(|b| b.fields["steamid"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["c", "b", "a", "d"]);
    assert_eq!(sets.tracked_players["88"], true);
    assert_eq!(sets.user_players["99"], true);
    assert!(sets.rating_players.is_empty());

    let value = serde_json::to_value(&sets).unwrap();
    assert!(value.get("trackedPlayers").is_some());
}

#[tokio::test]
async fn one_corrupt_set_fails_the_call() {
    let cache = Arc::new(
        MemoryCache::default()
            .with_entry(BOTS_KEY, "[]")
            .with_entry(USER_PLAYERS_KEY, "[1, 2"),
    );
    let q = queries_with(MemoryStore::default(), cache);

    let err = q.get_sets().await.unwrap_err();

    match err {
        Error::CacheCorruption { key, .. } => assert_eq!(key, USER_PLAYERS_KEY),
        other => panic!("expected cache corruption, got {:?}", other),
    }
}

#[tokio::test]
async fn ratings_are_newest_first() {
    let rating = |match_id: u64, day: u32| Rating {
        account_id: 5,
        match_id: Some(match_id),
        solo_competitive_rank: Some(3000),
        competitive_rank: None,
        time: Utc.with_ymd_and_hms(2015, 6, day, 12, 0, 0).unwrap(),
    };
    let store = MemoryStore::default();
    store
        .ratings
        .lock()
        .unwrap()
        .extend([rating(1, 1), rating(3, 3), rating(2, 2)]);
    let q = queries_with(store, Arc::new(MemoryCache::default()));

    let ratings = q.get_rating_data(5).await.unwrap();
    let ids: Vec<Option<u64>> = ratings.iter().map(|r| r.match_id).collect();

    assert_eq!(ids, vec![Some(3), Some(2), Some(1)]);
    assert!(q.get_rating_data(6).await.unwrap().is_empty());
}
