use serde::{Deserialize, Serialize};

pub mod achievement;
pub mod answer;
pub mod events;
pub mod exercise;
pub mod progress;
pub mod session;

pub use achievement::{Achievement, GrantedAchievement};
pub use exercise::{Exercise, ExerciseKind, ExerciseOption, ExerciseView, RawExercise};
pub use progress::{
    AttemptRecord, LevelMap, LevelProgress, LevelUnlockView, PlanetUnlockView, ProgressOverview,
    UnlockSource,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: String,
    pub planet_id: String,
    pub order_index: i32,
    #[serde(default)]
    pub title: String,
}

/// Envelope every mission API endpoint answers with.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "envelope_success_default")]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

fn envelope_success_default() -> bool {
    true
}
