use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scored question, built by the engine and sent to the mission API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub student_id: String,
    pub exercise_id: String,
    pub chosen_answer: Option<String>,
    pub is_correct: bool,
    pub score_awarded: u32,
    pub time_taken_seconds: u32,
    pub hints_used: u32,
    pub created_at: DateTime<Utc>,
}

/// Backend-maintained per-level progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    #[serde(alias = "userId", default)]
    pub student_id: String,
    pub level_id: String,
    #[serde(default)]
    pub total_exercises: u32,
    #[serde(default)]
    pub completed_exercises: u32,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub time_spent_seconds: u32,
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LevelUnlockView {
    pub level_id: String,
    pub title: String,
    pub order_index: i32,
    pub is_unlocked: bool,
    pub is_locked: bool,
    pub is_current: bool,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnlockSource {
    /// Computed locally from the student's progress records.
    Progress,
    /// Taken from the mission API's own unlock computation.
    Remote,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelMap {
    pub planet_id: String,
    pub levels: Vec<LevelUnlockView>,
    pub current_level_id: Option<String>,
    pub source: UnlockSource,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanetUnlockView {
    pub planet_id: String,
    pub title: String,
    pub order_index: i32,
    pub is_unlocked: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressOverview {
    pub total_planets: usize,
    pub total_levels: usize,
    pub completed_levels: usize,
    pub overall_percent: f64,
    pub total_score: u64,
    pub total_time_spent_seconds: u64,
}

// Wire shape of `GET planets/{id}/levels/unlock-status`.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLevelStatus {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub is_unlocked: bool,
    #[serde(default)]
    pub is_locked: Option<bool>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUnlockStatus {
    #[serde(default)]
    pub levels: Vec<RemoteLevelStatus>,
    #[serde(default)]
    pub current_level_id: Option<String>,
}
