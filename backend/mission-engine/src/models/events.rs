use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::achievement::Achievement;
use super::progress::LevelProgress;
use super::session::AnswerCause;

/// Events pushed to the student's UI over the quiz stream.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuizEvent {
    TimerTick(TimerTick),
    Answered(Answered),
    AchievementUnlocked(AchievementUnlocked),
    Notification(Notification),
    LevelComplete(LevelComplete),
}

#[derive(Debug, Serialize, Clone)]
pub struct TimerTick {
    pub session_id: Uuid,
    pub exercise_id: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Answered {
    pub session_id: Uuid,
    pub exercise_id: String,
    pub cause: AnswerCause,
    pub is_correct: bool,
    pub score: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct AchievementUnlocked {
    pub achievement: Achievement,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Notification {
    pub severity: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct LevelComplete {
    pub level_id: String,
    pub result: LevelProgress,
    pub timestamp: DateTime<Utc>,
}

impl QuizEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            QuizEvent::TimerTick(_) => "timer-tick",
            QuizEvent::Answered(_) => "answered",
            QuizEvent::AchievementUnlocked(_) => "achievement-unlocked",
            QuizEvent::Notification(_) => "notification",
            QuizEvent::LevelComplete(_) => "level-complete",
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        QuizEvent::Notification(Notification {
            severity: "warning",
            message: message.into(),
            timestamp: Utc::now(),
        })
    }
}
