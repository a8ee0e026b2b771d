use serde::{Deserialize, Serialize};
use validator::Validate;

use super::achievement::GrantedAchievement;

/// Body of `POST exercises/{id}/submit`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub answer: Option<String>,
    pub time_taken_seconds: u32,
    pub hints_used: u32,
}

/// `data` part of the submission response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerData {
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub newly_granted_achievements: Vec<GrantedAchievement>,
}

// UI-facing payloads.

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(min = 1, max = 128, message = "level_id must not be empty"))]
    pub level_id: String,
    /// Resume at this exercise instead of the first one.
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "exercise_id must not be empty"))]
    pub exercise_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(min = 1, max = 128, message = "exercise_id must not be empty"))]
    pub exercise_id: String,
    #[validate(length(min = 1, max = 256, message = "answer must not be empty"))]
    pub answer: String,
}
