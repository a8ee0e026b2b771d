mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{create_test_state, level, level_progress, planet, FakeMissionApi};
use spacemission_engine::models::{
    progress::{RemoteLevelStatus, RemoteUnlockStatus},
    UnlockSource,
};

const STUDENT: &str = "cadet-3";

fn galaxy() -> FakeMissionApi {
    let mut api = FakeMissionApi {
        planets: vec![planet("mars", 2), planet("mercury", 1)],
        ..FakeMissionApi::default()
    };
    api.levels.insert(
        "mercury".into(),
        vec![level("me-2", "mercury", 2), level("me-1", "mercury", 1)],
    );
    api.levels.insert(
        "mars".into(),
        vec![
            level("ma-1", "mars", 1),
            level("ma-2", "mars", 2),
            level("ma-3", "mars", 3),
        ],
    );
    api
}

#[tokio::test]
async fn test_level_map_from_progress() {
    let api = galaxy();
    *api.progress.lock().unwrap() = vec![
        level_progress("ma-1", 100.0, true),
        level_progress("ma-2", 50.0, false),
    ];
    let state = create_test_state(Arc::new(api));

    let map = state.engine.level_map(STUDENT, "mars").await.unwrap();

    assert_eq!(map.source, UnlockSource::Progress);
    assert_eq!(map.current_level_id.as_deref(), Some("ma-2"));
    let unlocked: Vec<bool> = map.levels.iter().map(|l| l.is_unlocked).collect();
    assert_eq!(unlocked, vec![true, true, false]);
    assert!(map.levels[2].is_locked);
    assert_eq!(map.levels[1].completion_percentage, 50.0);
}

#[tokio::test]
async fn test_level_map_without_progress_opens_first_level_only() {
    let state = create_test_state(Arc::new(galaxy()));

    let map = state.engine.level_map(STUDENT, "mercury").await.unwrap();

    let ids: Vec<&str> = map.levels.iter().map(|l| l.level_id.as_str()).collect();
    assert_eq!(ids, vec!["me-1", "me-2"]);
    assert!(map.levels[0].is_unlocked && map.levels[0].is_current);
    assert!(map.levels[1].is_locked);
}

#[tokio::test]
async fn test_level_map_falls_back_to_remote_status() {
    let mut api = galaxy();
    api.remote_unlock = Some(RemoteUnlockStatus {
        levels: vec![
            RemoteLevelStatus {
                id: "ma-2".into(),
                title: "Dunes".into(),
                order_index: 2,
                is_unlocked: false,
                is_locked: None,
                is_current: false,
                completion_percentage: 0.0,
            },
            RemoteLevelStatus {
                id: "ma-1".into(),
                title: "Landing".into(),
                order_index: 1,
                is_unlocked: true,
                is_locked: None,
                is_current: false,
                completion_percentage: 20.0,
            },
        ],
        current_level_id: Some("ma-1".into()),
    });
    api.fail_progress.store(true, Ordering::SeqCst);
    let state = create_test_state(Arc::new(api));

    let map = state.engine.level_map(STUDENT, "mars").await.unwrap();

    assert_eq!(map.source, UnlockSource::Remote);
    assert_eq!(map.current_level_id.as_deref(), Some("ma-1"));
    assert_eq!(map.levels[0].level_id, "ma-1");
    assert!(map.levels[0].is_current);
    assert!(map.levels[1].is_locked);
}

#[tokio::test]
async fn test_level_map_fails_when_no_source_is_available() {
    let api = galaxy();
    api.fail_progress.store(true, Ordering::SeqCst);
    let state = create_test_state(Arc::new(api));

    let result = state.engine.level_map(STUDENT, "mars").await;

    assert!(matches!(result, Err(e) if e.is_retryable()));
}

#[tokio::test]
async fn test_planets_open_in_order() {
    let api = galaxy();
    *api.progress.lock().unwrap() = vec![
        level_progress("me-1", 100.0, true),
        level_progress("me-2", 100.0, true),
    ];
    let state = create_test_state(Arc::new(api));

    let planets = state.engine.planets(STUDENT).await.unwrap();

    assert_eq!(planets[0].planet_id, "mercury");
    assert!(planets[0].is_completed);
    assert_eq!(planets[1].planet_id, "mars");
    assert!(planets[1].is_unlocked);
    assert!(!planets[1].is_completed);
}

#[tokio::test]
async fn test_dashboard_totals() {
    let api = galaxy();
    *api.progress.lock().unwrap() = vec![
        level_progress("me-1", 100.0, true),
        level_progress("me-2", 50.0, false),
        level_progress("ma-1", 100.0, true),
    ];
    let state = create_test_state(Arc::new(api));

    let overview = state.engine.dashboard(STUDENT).await.unwrap();

    assert_eq!(overview.total_planets, 2);
    assert_eq!(overview.total_levels, 5);
    assert_eq!(overview.completed_levels, 2);
    assert_eq!(overview.overall_percent, 50.0);
    assert_eq!(overview.total_score, 25);
    assert_eq!(overview.total_time_spent_seconds, 180);
}
