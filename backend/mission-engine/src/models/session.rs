use serde::Serialize;
use uuid::Uuid;

use super::achievement::Achievement;
use super::exercise::ExerciseView;
use super::progress::LevelProgress;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerCause {
    Submitted,
    TimedOut,
}

/// Fixed result of a question once it left the active state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub cause: AnswerCause,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
    pub score: u32,
    pub time_taken_seconds: u32,
    pub hints_used: u32,
}

impl AnswerOutcome {
    pub fn timed_out(&self) -> bool {
        self.cause == AnswerCause::TimedOut
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active,
    Answered,
    LevelComplete,
}

/// Where the submission of the current question stands.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Accepted { correct: Option<bool> },
    Failed { message: String },
}

/// Read model rendered by the UI for the current question.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSnapshot {
    pub run_id: Uuid,
    pub session_id: Uuid,
    pub level_id: String,
    pub status: SessionStatus,
    /// 1-based position of the current exercise within the level.
    pub position: usize,
    pub total_exercises: usize,
    pub exercise: Option<ExerciseView>,
    pub remaining_seconds: Option<u32>,
    pub selected_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub awarded_score: u32,
    pub timed_out: bool,
    pub hints_used: u32,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub unusable_reason: Option<String>,
    pub dispatch: Option<DispatchStatus>,
    pub new_achievements: Vec<Achievement>,
    pub level_result: Option<LevelProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    /// False when the request arrived after the question was already decided.
    pub accepted: bool,
    pub quiz: QuizSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct HintResponse {
    pub exercise_id: String,
    pub hint: String,
    pub hints_used: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextStep {
    Exercise { quiz: QuizSnapshot },
    LevelComplete { level_id: String, result: LevelProgress },
}
