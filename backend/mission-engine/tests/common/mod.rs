#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use spacemission_engine::{
    config::Config,
    create_router,
    error::{EngineError, EngineResult},
    models::{
        answer::{SubmitAnswerData, SubmitAnswerRequest},
        progress::RemoteUnlockStatus,
        Achievement, GrantedAchievement, Level, LevelProgress, Planet, RawExercise,
    },
    services::{mission_api::MissionApi, AppState},
};

/// One recorded `submit_answer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub student_id: String,
    pub exercise_id: String,
    pub request: SubmitAnswerRequest,
}

/// In-memory mission API with switches for the failure paths.
#[derive(Default)]
pub struct FakeMissionApi {
    pub planets: Vec<Planet>,
    pub levels: HashMap<String, Vec<Level>>,
    pub exercises: HashMap<String, Vec<RawExercise>>,
    pub progress: Mutex<Vec<LevelProgress>>,
    pub achievements: Vec<Achievement>,
    /// Achievements granted by a correct submission, per exercise.
    pub grants: HashMap<String, Vec<GrantedAchievement>>,
    pub remote_unlock: Option<RemoteUnlockStatus>,

    pub submissions: Mutex<Vec<Submission>>,
    pub submissions_started: AtomicUsize,
    pub exercise_fetches: AtomicUsize,
    pub achievement_fetches: AtomicUsize,

    pub fail_exercise_fetches: AtomicUsize,
    pub fail_submissions: AtomicBool,
    pub fail_progress: AtomicBool,
    pub fail_ping: AtomicBool,
    pub hold_submissions: AtomicBool,
    pub release_submission: Notify,
}

impl FakeMissionApi {
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn with_level(mut self, level_id: &str, exercises: Vec<Value>) -> Self {
        let parsed = exercises
            .into_iter()
            .map(|value| serde_json::from_value(value).expect("valid exercise json"))
            .collect();
        self.exercises.insert(level_id.to_string(), parsed);
        self
    }

    pub fn with_grants(mut self, exercise_id: &str, grants: Vec<Value>) -> Self {
        let parsed = grants
            .into_iter()
            .map(|value| serde_json::from_value(value).expect("valid grant json"))
            .collect();
        self.grants.insert(exercise_id.to_string(), parsed);
        self
    }
}

#[async_trait]
impl MissionApi for FakeMissionApi {
    async fn ping(&self) -> EngineResult<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(EngineError::fetch("health", "connection refused"));
        }
        Ok(())
    }

    async fn planets(&self) -> EngineResult<Vec<Planet>> {
        Ok(self.planets.clone())
    }

    async fn levels_by_planet(&self, planet_id: &str) -> EngineResult<Vec<Level>> {
        Ok(self.levels.get(planet_id).cloned().unwrap_or_default())
    }

    async fn exercises_by_level(&self, level_id: &str) -> EngineResult<Vec<RawExercise>> {
        self.exercise_fetches.fetch_add(1, Ordering::SeqCst);
        let failures_left = self.fail_exercise_fetches.load(Ordering::SeqCst);
        if failures_left > 0 {
            self.fail_exercise_fetches
                .store(failures_left - 1, Ordering::SeqCst);
            return Err(EngineError::fetch("exercises", "upstream timeout"));
        }
        self.exercises
            .get(level_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("level {}", level_id)))
    }

    async fn exercise_by_id(&self, exercise_id: &str) -> EngineResult<RawExercise> {
        self.exercises
            .values()
            .flatten()
            .find(|exercise| exercise.id == exercise_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("exercise {}", exercise_id)))
    }

    async fn submit_answer(
        &self,
        student_id: &str,
        exercise_id: &str,
        request: &SubmitAnswerRequest,
    ) -> EngineResult<SubmitAnswerData> {
        self.submissions_started.fetch_add(1, Ordering::SeqCst);
        if self.hold_submissions.load(Ordering::SeqCst) {
            self.release_submission.notified().await;
        }

        self.submissions.lock().unwrap().push(Submission {
            student_id: student_id.to_string(),
            exercise_id: exercise_id.to_string(),
            request: request.clone(),
        });

        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(EngineError::Submission("503 Service Unavailable".into()));
        }

        Ok(SubmitAnswerData {
            correct: None,
            newly_granted_achievements: self.grants.get(exercise_id).cloned().unwrap_or_default(),
        })
    }

    async fn levels_with_unlock_status(
        &self,
        _student_id: &str,
        planet_id: &str,
    ) -> EngineResult<RemoteUnlockStatus> {
        self.remote_unlock
            .clone()
            .ok_or_else(|| EngineError::fetch(format!("unlock status for {}", planet_id), "n/a"))
    }

    async fn user_progress(&self, _student_id: &str) -> EngineResult<Vec<LevelProgress>> {
        if self.fail_progress.load(Ordering::SeqCst) {
            return Err(EngineError::fetch("progress", "connection reset"));
        }
        Ok(self.progress.lock().unwrap().clone())
    }

    async fn achievements(&self) -> EngineResult<Vec<Achievement>> {
        self.achievement_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.achievements.clone())
    }
}

pub fn multiple_choice(id: &str, order: i32, points: u32, time_limit: u32, correct: &str) -> Value {
    json!({
        "id": id,
        "orderIndex": order,
        "type": "multiple_choice",
        "prompt": format!("Question {}", id),
        "options": ["Mercury", "Venus", "Earth", "Mars"],
        "correctAnswer": correct,
        "points": points,
        "timeLimitSeconds": time_limit,
        "explanation": "Mars is red because of iron oxide.",
        "hint": "Think about rust."
    })
}

pub fn level(id: &str, planet_id: &str, order: i32) -> Level {
    Level {
        id: id.to_string(),
        planet_id: planet_id.to_string(),
        order_index: order,
        title: format!("Level {}", id),
    }
}

pub fn planet(id: &str, order: i32) -> Planet {
    Planet {
        id: id.to_string(),
        title: format!("Planet {}", id),
        description: String::new(),
        order_index: order,
    }
}

pub fn level_progress(level_id: &str, percent: f64, completed: bool) -> LevelProgress {
    LevelProgress {
        student_id: "cadet".into(),
        level_id: level_id.to_string(),
        total_exercises: 4,
        completed_exercises: (percent / 25.0) as u32,
        score: (percent / 10.0) as u32,
        time_spent_seconds: 60,
        completion_percentage: percent,
        is_completed: completed,
    }
}

/// The two-question level used across the flow tests: Q1 timed (30s, 10
/// points, answer "A"), Q2 untimed (5 points, answer "B").
pub fn solar_api() -> FakeMissionApi {
    FakeMissionApi::default().with_level(
        "lvl-1",
        vec![
            multiple_choice("q1", 1, 10, 30, "A"),
            multiple_choice("q2", 2, 5, 0, "B"),
        ],
    )
}

pub fn test_config() -> Config {
    Config {
        tick_interval_ms: 1000,
        fetch_retry_attempts: 3,
        ..Config::default()
    }
}

pub fn create_test_state(api: Arc<FakeMissionApi>) -> Arc<AppState> {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    Arc::new(AppState::with_api(&test_config(), api))
}

pub fn create_test_app(api: Arc<FakeMissionApi>) -> Router {
    create_router(create_test_state(api))
}

/// Lets spawned countdown and dispatch tasks run to their next await point.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
