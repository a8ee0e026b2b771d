use std::collections::{HashMap, HashSet};

use crate::models::{AttemptRecord, Exercise, Level, LevelProgress, ProgressOverview};

/// Indexes progress snapshots by level id. A later record for the same level
/// replaces an earlier one.
pub fn progress_map(progress: &[LevelProgress]) -> HashMap<String, LevelProgress> {
    progress
        .iter()
        .map(|record| (record.level_id.clone(), record.clone()))
        .collect()
}

/// Dashboard totals over every known level. `overall_percent` is the plain
/// mean of each level's completion percentage; levels without a record add 0.
pub fn aggregate(levels: &[Level], progress: &[LevelProgress]) -> ProgressOverview {
    let by_level = progress_map(progress);

    let total_planets = levels
        .iter()
        .map(|level| level.planet_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let known: Vec<Option<&LevelProgress>> =
        levels.iter().map(|level| by_level.get(&level.id)).collect();

    let completed_levels = known
        .iter()
        .filter(|record| record.map(|r| r.is_completed).unwrap_or(false))
        .count();

    let overall_percent = if known.is_empty() {
        0.0
    } else {
        known
            .iter()
            .map(|record| record.map(|r| r.completion_percentage).unwrap_or(0.0))
            .sum::<f64>()
            / known.len() as f64
    };

    ProgressOverview {
        total_planets,
        total_levels: levels.len(),
        completed_levels,
        overall_percent,
        total_score: known.iter().flatten().map(|r| u64::from(r.score)).sum(),
        total_time_spent_seconds: known
            .iter()
            .flatten()
            .map(|r| u64::from(r.time_spent_seconds))
            .sum(),
    }
}

/// Reduces the attempts made on a level into a progress record.
///
/// An exercise counts as completed once any attempt on it was correct; its
/// score is the best awarded score. Attempts on exercises that are not part of
/// the level are ignored.
pub fn summarize_level(
    student_id: &str,
    level_id: &str,
    exercises: &[Exercise],
    attempts: &[AttemptRecord],
) -> LevelProgress {
    let in_level: HashSet<&str> = exercises.iter().map(|e| e.id.as_str()).collect();

    let mut best_score: HashMap<&str, u32> = HashMap::new();
    let mut solved: HashSet<&str> = HashSet::new();
    let mut time_spent_seconds = 0u32;

    for attempt in attempts
        .iter()
        .filter(|attempt| attempt.student_id == student_id)
        .filter(|attempt| in_level.contains(attempt.exercise_id.as_str()))
    {
        let best = best_score.entry(attempt.exercise_id.as_str()).or_insert(0);
        *best = (*best).max(attempt.score_awarded);
        if attempt.is_correct {
            solved.insert(attempt.exercise_id.as_str());
        }
        time_spent_seconds = time_spent_seconds.saturating_add(attempt.time_taken_seconds);
    }

    let total_exercises = exercises.len() as u32;
    let completed_exercises = solved.len() as u32;
    let completion_percentage = if total_exercises == 0 {
        0.0
    } else {
        f64::from(completed_exercises) * 100.0 / f64::from(total_exercises)
    };

    LevelProgress {
        student_id: student_id.to_string(),
        level_id: level_id.to_string(),
        total_exercises,
        completed_exercises,
        score: best_score.values().sum(),
        time_spent_seconds,
        completion_percentage,
        is_completed: total_exercises > 0 && completed_exercises == total_exercises,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExerciseKind;
    use chrono::Utc;

    fn level(id: &str, planet: &str) -> Level {
        Level {
            id: id.into(),
            planet_id: planet.into(),
            order_index: 1,
            title: String::new(),
        }
    }

    fn record(level_id: &str, percent: f64, completed: bool, score: u32) -> LevelProgress {
        LevelProgress {
            student_id: "s1".into(),
            level_id: level_id.into(),
            total_exercises: 4,
            completed_exercises: 0,
            score,
            time_spent_seconds: 30,
            completion_percentage: percent,
            is_completed: completed,
        }
    }

    fn exercise(id: &str) -> Exercise {
        Exercise {
            id: id.into(),
            level_id: "l1".into(),
            order_index: 1,
            kind: ExerciseKind::Numeric,
            prompt: String::new(),
            options: Vec::new(),
            correct_answer: "1".into(),
            points: 5,
            time_limit_seconds: 0,
            explanation: None,
            hint: None,
        }
    }

    fn attempt(exercise_id: &str, correct: bool, score: u32, time: u32) -> AttemptRecord {
        AttemptRecord {
            student_id: "s1".into(),
            exercise_id: exercise_id.into(),
            chosen_answer: Some("x".into()),
            is_correct: correct,
            score_awarded: score,
            time_taken_seconds: time,
            hints_used: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn overall_percent_is_unweighted_mean_over_known_levels() {
        let levels = vec![level("a", "p1"), level("b", "p1"), level("c", "p2")];
        let progress = vec![record("a", 100.0, true, 40), record("b", 50.0, false, 10)];
        let overview = aggregate(&levels, &progress);

        assert_eq!(overview.total_planets, 2);
        assert_eq!(overview.total_levels, 3);
        assert_eq!(overview.completed_levels, 1);
        assert_eq!(overview.overall_percent, 50.0);
        assert_eq!(overview.total_score, 50);
        assert_eq!(overview.total_time_spent_seconds, 60);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let overview = aggregate(&[], &[]);
        assert_eq!(overview.overall_percent, 0.0);
        assert_eq!(overview.total_planets, 0);
    }

    #[test]
    fn summary_counts_distinct_correct_exercises() {
        let exercises = vec![exercise("q1"), exercise("q2")];
        let attempts = vec![
            attempt("q1", true, 30, 10),
            attempt("q2", false, 0, 5),
            attempt("elsewhere", true, 99, 1),
        ];
        let summary = summarize_level("s1", "l1", &exercises, &attempts);

        assert_eq!(summary.completed_exercises, 1);
        assert_eq!(summary.total_exercises, 2);
        assert_eq!(summary.completion_percentage, 50.0);
        assert_eq!(summary.score, 30);
        assert_eq!(summary.time_spent_seconds, 15);
        assert!(!summary.is_completed);
    }

    #[test]
    fn retrying_keeps_the_best_score() {
        let exercises = vec![exercise("q1")];
        let attempts = vec![attempt("q1", true, 12, 3), attempt("q1", true, 8, 3)];
        let summary = summarize_level("s1", "l1", &exercises, &attempts);
        assert_eq!(summary.score, 12);
        assert!(summary.is_completed);
    }
}
