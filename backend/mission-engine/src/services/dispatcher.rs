use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::metrics::DISPATCH_TOTAL;
use crate::models::answer::SubmitAnswerRequest;
use crate::models::Achievement;

use super::achievements::AchievementCatalog;
use super::mission_api::MissionApi;

/// Everything needed to report one decided question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTicket {
    pub session_id: Uuid,
    pub student_id: String,
    pub exercise_id: String,
    pub chosen_answer: Option<String>,
    pub time_taken_seconds: u32,
    pub hints_used: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Accepted {
        correct: Option<bool>,
        achievements: Vec<Achievement>,
    },
    /// Non-fatal: the locally computed score stands.
    Failed { message: String },
    /// This (session, exercise) pair was already dispatched.
    Duplicate,
}

/// Sends answered questions to the mission API, once per
/// (session, exercise). Never retries; failures come back as values.
pub struct SubmissionDispatcher {
    api: Arc<dyn MissionApi>,
    achievements: Arc<AchievementCatalog>,
    sent: Mutex<HashSet<(Uuid, String)>>,
}

impl SubmissionDispatcher {
    pub fn new(api: Arc<dyn MissionApi>, achievements: Arc<AchievementCatalog>) -> Self {
        Self {
            api,
            achievements,
            sent: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, ticket: &DispatchTicket) -> bool {
        let mut sent = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.insert((ticket.session_id, ticket.exercise_id.clone()))
    }

    pub async fn dispatch(&self, ticket: DispatchTicket) -> DispatchOutcome {
        if !self.claim(&ticket) {
            tracing::debug!(
                "Dropping duplicate dispatch: session={}, exercise={}",
                ticket.session_id,
                ticket.exercise_id
            );
            DISPATCH_TOTAL.with_label_values(&["duplicate"]).inc();
            return DispatchOutcome::Duplicate;
        }

        let request = SubmitAnswerRequest {
            answer: ticket.chosen_answer.clone(),
            time_taken_seconds: ticket.time_taken_seconds,
            hints_used: ticket.hints_used,
        };

        match self
            .api
            .submit_answer(&ticket.student_id, &ticket.exercise_id, &request)
            .await
        {
            Ok(data) => {
                let achievements = self
                    .achievements
                    .resolve(data.newly_granted_achievements)
                    .await;
                tracing::info!(
                    "Answer dispatched: student={}, exercise={}, new_achievements={}",
                    ticket.student_id,
                    ticket.exercise_id,
                    achievements.len()
                );
                DISPATCH_TOTAL.with_label_values(&["accepted"]).inc();
                DispatchOutcome::Accepted {
                    correct: data.correct,
                    achievements,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Answer dispatch failed: student={}, exercise={}: {}",
                    ticket.student_id,
                    ticket.exercise_id,
                    e
                );
                DISPATCH_TOTAL.with_label_values(&["failed"]).inc();
                DispatchOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
