use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPTION_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    #[serde(alias = "multiple-choice", alias = "multipleChoice")]
    MultipleChoice,
    #[serde(alias = "true-false", alias = "trueFalse", alias = "boolean")]
    TrueFalse,
    #[serde(alias = "number")]
    Numeric,
}

impl ExerciseKind {
    /// Kinds whose answer key is an option letter.
    pub fn uses_letters(&self) -> bool {
        matches!(self, ExerciseKind::MultipleChoice | ExerciseKind::TrueFalse)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseOption {
    pub letter: String,
    pub text: String,
}

/// Exercise after catalog normalization: letters assigned, answer key
/// canonical, ordering key present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub level_id: String,
    pub order_index: i32,
    pub kind: ExerciseKind,
    pub prompt: String,
    pub options: Vec<ExerciseOption>,
    pub correct_answer: String,
    pub points: u32,
    pub time_limit_seconds: u32,
    pub explanation: Option<String>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    #[error("correct answer is missing")]
    MissingCorrectAnswer,
    #[error("multiple choice exercise has no options")]
    MissingOptions,
    #[error("more than four options")]
    TooManyOptions,
    #[error("true/false exercise needs exactly two options")]
    InvalidTrueFalseOptions,
    #[error("correct answer does not match any option")]
    AnswerNotInOptions,
    #[error("exercise awards no points")]
    NoPoints,
}

impl Exercise {
    pub fn is_timed(&self) -> bool {
        self.time_limit_seconds > 0
    }

    /// Checks the exercise can be played. A failing exercise never becomes
    /// the active question.
    pub fn validate(&self) -> Result<(), MalformedReason> {
        if self.correct_answer.trim().is_empty() {
            return Err(MalformedReason::MissingCorrectAnswer);
        }
        if self.points == 0 {
            return Err(MalformedReason::NoPoints);
        }
        if self.options.len() > OPTION_LETTERS.len() {
            return Err(MalformedReason::TooManyOptions);
        }
        match self.kind {
            ExerciseKind::MultipleChoice if self.options.is_empty() => {
                return Err(MalformedReason::MissingOptions)
            }
            ExerciseKind::TrueFalse if self.options.len() != 2 => {
                return Err(MalformedReason::InvalidTrueFalseOptions)
            }
            _ => {}
        }
        if self.kind.uses_letters()
            && !self
                .options
                .iter()
                .any(|option| option.letter == self.correct_answer)
        {
            return Err(MalformedReason::AnswerNotInOptions);
        }
        Ok(())
    }

    /// Brings a raw user answer onto the same key as `correct_answer`.
    pub fn normalize_answer(&self, raw: &str) -> String {
        answer_key(self.kind, &self.options, raw)
    }
}

/// Canonical answer key: an option letter for lettered kinds (accepting the
/// letter, the option text, or a boolean word for true/false), the trimmed
/// literal for numeric exercises.
pub fn answer_key(kind: ExerciseKind, options: &[ExerciseOption], raw: &str) -> String {
    let trimmed = raw.trim();
    if !kind.uses_letters() {
        return trimmed.to_string();
    }

    let upper = trimmed.to_uppercase();
    if OPTION_LETTERS.contains(&upper.as_str()) {
        return upper;
    }

    if let Some(option) = options
        .iter()
        .find(|option| option.text.trim().eq_ignore_ascii_case(trimmed))
    {
        return option.letter.clone();
    }

    if kind == ExerciseKind::TrueFalse {
        let wanted = match upper.as_str() {
            "TRUE" | "T" | "1" | "YES" => Some(true),
            "FALSE" | "F" | "0" | "NO" => Some(false),
            _ => None,
        };
        if let Some(value) = wanted {
            let word = if value { "true" } else { "false" };
            return options
                .iter()
                .find(|option| option.text.trim().eq_ignore_ascii_case(word))
                .map(|option| option.letter.clone())
                .unwrap_or_else(|| if value { "A" } else { "B" }.to_string());
        }
    }

    upper
}

/// Exercise as served to the UI; never carries the answer key.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseView {
    pub id: String,
    pub kind: ExerciseKind,
    pub prompt: String,
    pub options: Vec<ExerciseOption>,
    pub points: u32,
    pub time_limit_seconds: u32,
    pub has_hint: bool,
}

impl From<&Exercise> for ExerciseView {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id.clone(),
            kind: exercise.kind,
            prompt: exercise.prompt.clone(),
            options: exercise.options.clone(),
            points: exercise.points,
            time_limit_seconds: exercise.time_limit_seconds,
            has_hint: exercise.hint.is_some(),
        }
    }
}

// Wire shapes served by the mission API.

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawOption {
    Text(String),
    Labeled {
        #[serde(alias = "key", alias = "label")]
        letter: Option<String>,
        #[serde(alias = "value", alias = "content")]
        text: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExercise {
    pub id: String,
    #[serde(default)]
    pub level_id: String,
    #[serde(default)]
    pub order_index: i32,
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    #[serde(alias = "question", default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Option<Vec<RawOption>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(alias = "timeLimit", default)]
    pub time_limit_seconds: u32,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

fn default_points() -> u32 {
    1
}
