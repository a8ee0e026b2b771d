use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::exercise::{answer_key, ExerciseOption, RawOption, OPTION_LETTERS};
use crate::models::{Exercise, ExerciseKind, RawExercise};
use crate::utils::retry::{retry_async_when, RetryConfig};

use super::mission_api::MissionApi;

/// Fetches exercises from the mission API and normalizes them.
#[derive(Clone)]
pub struct ExerciseCatalog {
    api: Arc<dyn MissionApi>,
    retry: RetryConfig,
}

impl ExerciseCatalog {
    pub fn new(api: Arc<dyn MissionApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    /// Exercises of a level, sorted by `order_index`.
    pub async fn exercises_for_level(&self, level_id: &str) -> EngineResult<Vec<Exercise>> {
        let raw = retry_async_when(
            self.retry.clone(),
            || self.api.exercises_by_level(level_id),
            EngineError::is_retryable,
        )
        .await?;

        let mut exercises: Vec<Exercise> = raw
            .into_iter()
            .map(|exercise| normalize_exercise(exercise, level_id))
            .collect();
        exercises.sort_by_key(|exercise| exercise.order_index);

        tracing::info!(
            "Loaded {} exercises for level {}",
            exercises.len(),
            level_id
        );
        Ok(exercises)
    }

    pub async fn exercise(&self, exercise_id: &str) -> EngineResult<Exercise> {
        let raw = retry_async_when(
            self.retry.clone(),
            || self.api.exercise_by_id(exercise_id),
            EngineError::is_retryable,
        )
        .await?;
        let level_id = raw.level_id.clone();
        Ok(normalize_exercise(raw, &level_id))
    }
}

/// Assigns option letters, fills the implicit true/false pair and maps the
/// answer key onto a letter. Never fails: unusable data is left for
/// [`Exercise::validate`] to reject.
pub fn normalize_exercise(raw: RawExercise, fallback_level_id: &str) -> Exercise {
    let mut options = normalize_options(raw.options.unwrap_or_default());
    if raw.kind == ExerciseKind::TrueFalse && options.is_empty() {
        options = vec![
            ExerciseOption {
                letter: "A".into(),
                text: "True".into(),
            },
            ExerciseOption {
                letter: "B".into(),
                text: "False".into(),
            },
        ];
    }
    if raw.kind == ExerciseKind::Numeric {
        options.clear();
    }

    let correct_answer = raw
        .correct_answer
        .as_deref()
        .map(|answer| answer_key(raw.kind, &options, answer))
        .unwrap_or_default();

    let level_id = if raw.level_id.is_empty() {
        fallback_level_id.to_string()
    } else {
        raw.level_id
    };

    Exercise {
        id: raw.id,
        level_id,
        order_index: raw.order_index,
        kind: raw.kind,
        prompt: raw.prompt,
        options,
        correct_answer,
        points: raw.points,
        time_limit_seconds: raw.time_limit_seconds,
        explanation: raw.explanation.filter(|text| !text.trim().is_empty()),
        hint: raw.hint.filter(|text| !text.trim().is_empty()),
    }
}

fn normalize_options(raw: Vec<RawOption>) -> Vec<ExerciseOption> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, option)| {
            let (letter, text) = match option {
                RawOption::Text(text) => (None, text),
                RawOption::Labeled { letter, text } => (letter, text),
            };
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let letter = letter
                .map(|letter| letter.trim().to_uppercase())
                .filter(|letter| !letter.is_empty())
                .unwrap_or_else(|| positional_letter(index));
            Some(ExerciseOption { letter, text })
        })
        .collect()
}

fn positional_letter(index: usize) -> String {
    OPTION_LETTERS
        .get(index)
        .map(|letter| letter.to_string())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::MalformedReason;

    fn raw(kind: ExerciseKind, options: Option<Vec<RawOption>>, correct: Option<&str>) -> RawExercise {
        RawExercise {
            id: "q1".into(),
            level_id: String::new(),
            order_index: 1,
            kind,
            prompt: "Prompt".into(),
            options,
            correct_answer: correct.map(str::to_string),
            points: 10,
            time_limit_seconds: 0,
            explanation: Some("  ".into()),
            hint: None,
        }
    }

    #[test]
    fn assigns_letters_by_position_and_maps_text_answers() {
        let exercise = normalize_exercise(
            raw(
                ExerciseKind::MultipleChoice,
                Some(vec![
                    RawOption::Text("Mercury".into()),
                    RawOption::Text("Saturn".into()),
                ]),
                Some("Saturn"),
            ),
            "lvl",
        );
        assert_eq!(exercise.level_id, "lvl");
        assert_eq!(exercise.options[1].letter, "B");
        assert_eq!(exercise.correct_answer, "B");
        assert_eq!(exercise.explanation, None);
        assert!(exercise.validate().is_ok());
    }

    #[test]
    fn true_false_without_options_gets_default_pair() {
        let exercise = normalize_exercise(raw(ExerciseKind::TrueFalse, None, Some("false")), "l");
        assert_eq!(exercise.options.len(), 2);
        assert_eq!(exercise.correct_answer, "B");
        assert!(exercise.validate().is_ok());
    }

    #[test]
    fn numeric_drops_options_and_keeps_literal() {
        let exercise = normalize_exercise(
            raw(
                ExerciseKind::Numeric,
                Some(vec![RawOption::Text("ignored".into())]),
                Some(" 9.8 "),
            ),
            "l",
        );
        assert!(exercise.options.is_empty());
        assert_eq!(exercise.correct_answer, "9.8");
    }

    #[test]
    fn missing_answer_survives_normalization_but_fails_validation() {
        let exercise = normalize_exercise(
            raw(
                ExerciseKind::MultipleChoice,
                Some(vec![RawOption::Text("x".into())]),
                None,
            ),
            "l",
        );
        assert_eq!(
            exercise.validate(),
            Err(MalformedReason::MissingCorrectAnswer)
        );
    }
}
