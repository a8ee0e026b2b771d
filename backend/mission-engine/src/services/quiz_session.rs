use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::exercise::MalformedReason;
use crate::models::session::{AnswerCause, AnswerOutcome};
use crate::models::Exercise;

use super::scoring;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    Idle,
    Active { remaining: Option<u32> },
    Answered(AnswerOutcome),
}

/// Lifecycle of a single question.
///
/// The only way out of `Active` is [`QuizSession::submit`] or
/// [`QuizSession::expire`]; both check the state first, so whichever runs
/// second is a no-op.
#[derive(Debug)]
pub struct QuizSession {
    id: Uuid,
    exercise: Option<Exercise>,
    state: QuizState,
    hints_used: u32,
    activated_at: Option<Instant>,
    unusable: Option<MalformedReason>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::idle()
    }
}

impl QuizSession {
    pub fn idle() -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise: None,
            state: QuizState::Idle,
            hints_used: 0,
            activated_at: None,
            unusable: None,
        }
    }

    /// Loads an exercise into a fresh session. A malformed exercise leaves the
    /// session idle and is remembered as the reason it cannot be played.
    pub fn load(exercise: Exercise, now: Instant) -> (Self, EngineResult<()>) {
        let mut session = Self::idle();
        let result = session.activate(exercise, now);
        (session, result)
    }

    fn activate(&mut self, exercise: Exercise, now: Instant) -> EngineResult<()> {
        if self.state != QuizState::Idle {
            return Ok(());
        }

        if let Err(reason) = exercise.validate() {
            tracing::warn!("Exercise {} is unusable: {}", exercise.id, reason);
            let exercise_id = exercise.id.clone();
            self.unusable = Some(reason);
            self.exercise = Some(exercise);
            return Err(EngineError::MalformedExercise {
                exercise_id,
                reason,
            });
        }

        let remaining = exercise.is_timed().then_some(exercise.time_limit_seconds);
        self.exercise = Some(exercise);
        self.state = QuizState::Active { remaining };
        self.activated_at = Some(now);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercise.as_ref()
    }

    pub fn exercise_id(&self) -> Option<&str> {
        self.exercise.as_ref().map(|exercise| exercise.id.as_str())
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn unusable(&self) -> Option<MalformedReason> {
        self.unusable
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, QuizState::Active { .. })
    }

    pub fn outcome(&self) -> Option<&AnswerOutcome> {
        match &self.state {
            QuizState::Answered(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        match self.state {
            QuizState::Active { remaining } => remaining,
            _ => None,
        }
    }

    /// User picked an answer. Returns the outcome only if this call moved the
    /// session out of `Active`.
    pub fn submit(&mut self, raw_answer: &str, now: Instant) -> Option<AnswerOutcome> {
        let QuizState::Active { remaining } = self.state else {
            return None;
        };
        let exercise = self.exercise.as_ref()?;

        let answer = exercise.normalize_answer(raw_answer);
        let result = scoring::evaluate(exercise, &answer, remaining);

        let time_taken_seconds = match remaining {
            Some(left) => exercise.time_limit_seconds.saturating_sub(left),
            None => self
                .activated_at
                .map(|started| now.saturating_duration_since(started).as_secs() as u32)
                .unwrap_or(0),
        };

        let outcome = AnswerOutcome {
            cause: AnswerCause::Submitted,
            selected_answer: Some(answer),
            is_correct: result.is_correct,
            score: result.score,
            time_taken_seconds,
            hints_used: self.hints_used,
        };
        self.state = QuizState::Answered(outcome.clone());
        Some(outcome)
    }

    /// Countdown tick. Ignored unless the session is active and timed.
    pub fn tick(&mut self, remaining_seconds: u32) -> bool {
        match &mut self.state {
            QuizState::Active {
                remaining: Some(remaining),
            } => {
                *remaining = (*remaining).min(remaining_seconds);
                true
            }
            _ => false,
        }
    }

    /// Countdown reached zero. Untimed sessions never expire.
    pub fn expire(&mut self) -> Option<AnswerOutcome> {
        let QuizState::Active {
            remaining: Some(_),
        } = self.state
        else {
            return None;
        };
        let exercise = self.exercise.as_ref()?;

        let outcome = AnswerOutcome {
            cause: AnswerCause::TimedOut,
            selected_answer: None,
            is_correct: false,
            score: 0,
            time_taken_seconds: exercise.time_limit_seconds,
            hints_used: self.hints_used,
        };
        self.state = QuizState::Answered(outcome.clone());
        Some(outcome)
    }

    /// Reveals the hint of the active exercise, counting each reveal.
    pub fn reveal_hint(&mut self) -> Option<String> {
        if !self.is_active() {
            return None;
        }
        let hint = self.exercise.as_ref()?.hint.clone()?;
        self.hints_used += 1;
        Some(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseKind, ExerciseOption};
    use std::time::Duration;

    fn exercise(time_limit: u32) -> Exercise {
        Exercise {
            id: "q1".into(),
            level_id: "l1".into(),
            order_index: 1,
            kind: ExerciseKind::MultipleChoice,
            prompt: "Which planet is red?".into(),
            options: ["Venus", "Mars"]
                .iter()
                .zip(["A", "B"])
                .map(|(text, letter)| ExerciseOption {
                    letter: letter.into(),
                    text: text.to_string(),
                })
                .collect(),
            correct_answer: "B".into(),
            points: 10,
            time_limit_seconds: time_limit,
            explanation: None,
            hint: Some("Think rust.".into()),
        }
    }

    fn active(time_limit: u32) -> QuizSession {
        let (session, result) = QuizSession::load(exercise(time_limit), Instant::now());
        assert!(result.is_ok());
        session
    }

    #[test]
    fn load_starts_countdown_state() {
        let session = active(30);
        assert_eq!(session.state(), &QuizState::Active { remaining: Some(30) });
        assert_eq!(active(0).state(), &QuizState::Active { remaining: None });
    }

    #[test]
    fn malformed_exercise_stays_idle() {
        let mut broken = exercise(30);
        broken.options.clear();
        let (session, result) = QuizSession::load(broken, Instant::now());

        assert!(matches!(
            result,
            Err(EngineError::MalformedExercise {
                reason: MalformedReason::MissingOptions,
                ..
            })
        ));
        assert_eq!(session.state(), &QuizState::Idle);
        assert_eq!(session.unusable(), Some(MalformedReason::MissingOptions));
    }

    #[test]
    fn first_submission_wins() {
        let mut session = active(30);
        session.tick(20);
        let outcome = session.submit("mars", Instant::now()).unwrap();

        assert!(outcome.is_correct);
        assert_eq!(outcome.score, 30);
        assert_eq!(outcome.time_taken_seconds, 10);
        assert_eq!(outcome.selected_answer.as_deref(), Some("B"));
        assert!(session.submit("A", Instant::now()).is_none());
        assert_eq!(session.outcome(), Some(&outcome));
    }

    #[test]
    fn submit_then_expire_keeps_the_submission() {
        let mut session = active(5);
        assert!(session.submit("A", Instant::now()).is_some());
        assert!(session.expire().is_none());
        let outcome = session.outcome().unwrap();
        assert!(!outcome.timed_out());
        assert!(!outcome.is_correct);
    }

    #[test]
    fn expire_then_submit_keeps_the_timeout() {
        let mut session = active(15);
        let outcome = session.expire().unwrap();
        assert!(outcome.timed_out());
        assert_eq!(outcome.selected_answer, None);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.time_taken_seconds, 15);

        assert!(session.submit("B", Instant::now()).is_none());
        assert!(!session.tick(3));
        assert!(session.outcome().unwrap().timed_out());
    }

    #[test]
    fn untimed_sessions_never_expire() {
        let mut session = active(0);
        assert!(!session.tick(0));
        assert!(session.expire().is_none());
        assert!(session.is_active());
    }

    #[test]
    fn untimed_time_taken_uses_elapsed_wall_time() {
        let started = Instant::now();
        let (mut session, _) = QuizSession::load(exercise(0), started);
        let outcome = session
            .submit("B", started + Duration::from_secs(7))
            .unwrap();
        assert_eq!(outcome.time_taken_seconds, 7);
        assert_eq!(outcome.score, 10);
    }

    #[test]
    fn hints_are_counted_only_while_active() {
        let mut session = active(30);
        assert_eq!(session.reveal_hint().as_deref(), Some("Think rust."));
        assert_eq!(session.reveal_hint().as_deref(), Some("Think rust."));
        let outcome = session.submit("B", Instant::now()).unwrap();
        assert_eq!(outcome.hints_used, 2);
        assert!(session.reveal_hint().is_none());
    }

    #[test]
    fn ticks_never_raise_remaining_time() {
        let mut session = active(10);
        session.tick(4);
        session.tick(8);
        assert_eq!(session.remaining_seconds(), Some(4));
    }
}
