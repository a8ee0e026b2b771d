use serde::Serialize;

use crate::models::Exercise;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub is_correct: bool,
    pub score: u32,
}

/// Scores a normalized answer.
///
/// A correct answer earns the exercise points plus the remaining countdown
/// seconds on timed exercises. The bonus is raw seconds, not scaled by the
/// time limit or the point value.
pub fn evaluate(exercise: &Exercise, chosen_answer: &str, remaining_seconds: Option<u32>) -> Score {
    let is_correct = chosen_answer == exercise.correct_answer;
    if !is_correct {
        return Score {
            is_correct,
            score: 0,
        };
    }

    let time_bonus = if exercise.is_timed() {
        remaining_seconds.unwrap_or(0)
    } else {
        0
    };

    Score {
        is_correct,
        score: exercise.points.saturating_add(time_bonus),
    }
}
