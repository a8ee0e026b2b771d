use thiserror::Error;

use crate::models::exercise::MalformedReason;

/// Failures crossing a component boundary. Remote collaborator errors are
/// converted into one of these variants before they reach the quiz flow.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to fetch {resource}: {message}")]
    Fetch { resource: String, message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("exercise {exercise_id} cannot be played: {reason}")]
    MalformedExercise {
        exercise_id: String,
        reason: MalformedReason,
    },

    #[error("answer submission failed: {0}")]
    Submission(String),

    #[error("no quiz in progress for student {0}")]
    NoActiveQuiz(String),

    #[error("exercise {0} is still waiting for an answer")]
    AnswerPending(String),

    #[error("exercise {0} no longer accepts input")]
    QuestionClosed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn fetch(resource: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Fetch {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        EngineError::NotFound {
            resource: resource.into(),
        }
    }

    /// Transient failures the UI may offer a retry for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Fetch { .. } | EngineError::Submission(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
