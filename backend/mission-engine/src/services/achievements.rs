use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Achievement, GrantedAchievement};

use super::mission_api::MissionApi;

#[derive(Debug, Default)]
struct CatalogIndex {
    by_code: HashMap<String, Achievement>,
    by_id: HashMap<String, Achievement>,
}

impl CatalogIndex {
    fn build(achievements: Vec<Achievement>) -> Self {
        let mut index = Self::default();
        for achievement in achievements {
            if let Some(code) = achievement.code.clone() {
                index.by_code.insert(code, achievement.clone());
            }
            index.by_id.insert(achievement.id.clone(), achievement);
        }
        index
    }

    fn lookup(&self, granted: &GrantedAchievement) -> Option<&Achievement> {
        granted
            .code
            .as_deref()
            .and_then(|code| self.by_code.get(code))
            .or_else(|| {
                granted
                    .achievement_id
                    .as_deref()
                    .and_then(|id| self.by_id.get(id))
            })
    }
}

/// Locally cached achievement catalog, loaded on first use.
pub struct AchievementCatalog {
    api: Arc<dyn MissionApi>,
    index: RwLock<Option<CatalogIndex>>,
}

impl AchievementCatalog {
    pub fn new(api: Arc<dyn MissionApi>) -> Self {
        Self {
            api,
            index: RwLock::new(None),
        }
    }

    async fn ensure_loaded(&self) {
        if self.index.read().await.is_some() {
            return;
        }

        let mut guard = self.index.write().await;
        if guard.is_some() {
            return;
        }
        match self.api.achievements().await {
            Ok(achievements) => {
                tracing::info!("Achievement catalog loaded: {} entries", achievements.len());
                *guard = Some(CatalogIndex::build(achievements));
            }
            Err(e) => {
                // Left unset so the next dispatch tries again.
                tracing::warn!("Achievement catalog unavailable: {}", e);
            }
        }
    }

    /// Matches granted references against the catalog and drops repeats.
    /// Unknown achievements fall back to whatever the backend sent.
    pub async fn resolve(&self, granted: Vec<GrantedAchievement>) -> Vec<Achievement> {
        if granted.is_empty() {
            return Vec::new();
        }
        self.ensure_loaded().await;
        let index = self.index.read().await;

        let mut seen: HashSet<String> = HashSet::new();
        let mut resolved = Vec::new();
        for item in granted {
            if item.key().is_none() {
                tracing::debug!("Skipping granted achievement without code or id");
                continue;
            }

            let achievement = index
                .as_ref()
                .and_then(|index| index.lookup(&item))
                .cloned()
                .or_else(|| item.into_achievement());
            let Some(achievement) = achievement else {
                continue;
            };

            // The same badge can come back under its code and under its id;
            // after catalog matching both carry the same identity.
            let identity = achievement
                .code
                .clone()
                .unwrap_or_else(|| achievement.id.clone());
            if seen.insert(identity) {
                resolved.push(achievement);
            }
        }
        resolved
    }
}
