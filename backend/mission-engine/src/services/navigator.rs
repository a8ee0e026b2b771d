use crate::models::Exercise;

#[derive(Debug, Clone, PartialEq)]
pub enum Next<'a> {
    Exercise(&'a Exercise),
    LevelComplete,
}

fn ordered(exercises: &[Exercise]) -> Vec<&Exercise> {
    let mut ordered: Vec<&Exercise> = exercises.iter().collect();
    ordered.sort_by_key(|exercise| exercise.order_index);
    ordered
}

/// Entry point of a level; an empty level is immediately complete.
pub fn first(exercises: &[Exercise]) -> Next<'_> {
    ordered(exercises)
        .first()
        .copied()
        .map(Next::Exercise)
        .unwrap_or(Next::LevelComplete)
}

/// Exercise following `current_id` in `order_index` order.
///
/// An id that is no longer part of the level (deleted mid-session) resolves to
/// `LevelComplete` just like the last exercise does.
pub fn next<'a>(exercises: &'a [Exercise], current_id: &str) -> Next<'a> {
    let ordered = ordered(exercises);
    ordered
        .iter()
        .position(|exercise| exercise.id == current_id)
        .and_then(|index| ordered.get(index + 1).copied())
        .map(Next::Exercise)
        .unwrap_or(Next::LevelComplete)
}

/// 1-based position of an exercise within the level, if present.
pub fn position(exercises: &[Exercise], exercise_id: &str) -> Option<usize> {
    ordered(exercises)
        .iter()
        .position(|exercise| exercise.id == exercise_id)
        .map(|index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExerciseKind;

    fn exercise(id: &str, order: i32) -> Exercise {
        Exercise {
            id: id.into(),
            level_id: "l1".into(),
            order_index: order,
            kind: ExerciseKind::Numeric,
            prompt: String::new(),
            options: Vec::new(),
            correct_answer: "1".into(),
            points: 1,
            time_limit_seconds: 0,
            explanation: None,
            hint: None,
        }
    }

    #[test]
    fn follows_order_index_not_input_order() {
        let exercises = vec![exercise("c", 3), exercise("a", 1), exercise("b", 2)];
        assert_eq!(first(&exercises), Next::Exercise(&exercises[1]));
        assert_eq!(next(&exercises, "a"), Next::Exercise(&exercises[2]));
        assert_eq!(next(&exercises, "c"), Next::LevelComplete);
        assert_eq!(position(&exercises, "b"), Some(2));
    }

    #[test]
    fn unknown_id_and_empty_level_complete_the_level() {
        let exercises = vec![exercise("a", 1)];
        assert_eq!(next(&exercises, "deleted"), Next::LevelComplete);
        assert_eq!(first(&[]), Next::LevelComplete);
    }

    #[test]
    fn walking_from_first_takes_exactly_len_steps() {
        for len in 0..6 {
            let exercises: Vec<Exercise> = (0..len)
                .map(|i| exercise(&format!("q{}", i), (len - i) as i32))
                .collect();
            let mut steps = 0;
            let mut cursor = first(&exercises);
            while let Next::Exercise(current) = cursor {
                steps += 1;
                cursor = next(&exercises, &current.id);
            }
            assert_eq!(steps, len);
        }
    }
}
