use std::collections::HashMap;

use crate::models::progress::RemoteUnlockStatus;
use crate::models::{Level, LevelProgress, LevelUnlockView, Planet, PlanetUnlockView};

/// Computes locked / unlocked / current for the levels of one planet.
///
/// Levels are ordered by `order_index`. The first level is always open; every
/// other level opens once its predecessor is completed. The first open level
/// that is not completed is the current one. Levels without a progress record
/// count as 0 % complete.
pub fn resolve(
    levels: &[Level],
    progress: &HashMap<String, LevelProgress>,
) -> Vec<LevelUnlockView> {
    let mut ordered: Vec<&Level> = levels.iter().collect();
    ordered.sort_by_key(|level| level.order_index);

    let is_completed = |level: &Level| {
        progress
            .get(&level.id)
            .map(|record| record.is_completed)
            .unwrap_or(false)
    };

    let mut views = Vec::with_capacity(ordered.len());
    let mut current_assigned = false;

    for (index, level) in ordered.iter().enumerate() {
        let is_unlocked = index == 0 || is_completed(ordered[index - 1]);
        let is_current = is_unlocked && !current_assigned && !is_completed(level);
        if is_current {
            current_assigned = true;
        }

        views.push(LevelUnlockView {
            level_id: level.id.clone(),
            title: level.title.clone(),
            order_index: level.order_index,
            is_unlocked,
            is_locked: !is_unlocked,
            is_current,
            completion_percentage: progress
                .get(&level.id)
                .map(|record| record.completion_percentage)
                .unwrap_or(0.0),
        });
    }

    views
}

pub fn current_level_id(views: &[LevelUnlockView]) -> Option<String> {
    views
        .iter()
        .find(|view| view.is_current)
        .map(|view| view.level_id.clone())
}

/// Planet-level gating: the first planet is open, each following planet opens
/// once every level of the previous planet is completed.
pub fn resolve_planets(
    planets: &[Planet],
    levels: &[Level],
    progress: &HashMap<String, LevelProgress>,
) -> Vec<PlanetUnlockView> {
    let mut ordered: Vec<&Planet> = planets.iter().collect();
    ordered.sort_by_key(|planet| planet.order_index);

    let planet_completed = |planet: &Planet| {
        let owned: Vec<&Level> = levels
            .iter()
            .filter(|level| level.planet_id == planet.id)
            .collect();
        !owned.is_empty()
            && owned.iter().all(|level| {
                progress
                    .get(&level.id)
                    .map(|record| record.is_completed)
                    .unwrap_or(false)
            })
    };

    ordered
        .iter()
        .enumerate()
        .map(|(index, planet)| PlanetUnlockView {
            planet_id: planet.id.clone(),
            title: planet.title.clone(),
            order_index: planet.order_index,
            is_unlocked: index == 0 || planet_completed(ordered[index - 1]),
            is_completed: planet_completed(planet),
        })
        .collect()
}

/// Converts the mission API's own unlock computation into views.
pub fn from_remote(status: RemoteUnlockStatus) -> Vec<LevelUnlockView> {
    let mut levels = status.levels;
    levels.sort_by_key(|level| level.order_index);
    let current = status.current_level_id;
    levels
        .into_iter()
        .map(|level| LevelUnlockView {
            // current_level_id wins over the per-level flags
            is_current: match current.as_deref() {
                Some(current) => current == level.id,
                None => level.is_current,
            },
            is_locked: level.is_locked.unwrap_or(!level.is_unlocked),
            is_unlocked: level.is_unlocked,
            level_id: level.id,
            title: level.title,
            order_index: level.order_index,
            completion_percentage: level.completion_percentage,
        })
        .collect()
}
