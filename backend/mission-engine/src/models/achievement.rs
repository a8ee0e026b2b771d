use serde::{Deserialize, Serialize};

/// Catalog entry for a badge the backend can grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Achievement reference returned by a submission. The backend sends either
/// a `code`, an `achievementId`, or both, sometimes with display fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GrantedAchievement {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "id")]
    pub achievement_id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl GrantedAchievement {
    /// Identity used for de-duplication: code first, then achievement id.
    pub fn key(&self) -> Option<&str> {
        self.code
            .as_deref()
            .or(self.achievement_id.as_deref())
            .filter(|key| !key.is_empty())
    }

    /// Fallback when the catalog has no matching entry.
    pub fn into_achievement(self) -> Option<Achievement> {
        let id = self
            .achievement_id
            .clone()
            .or_else(|| self.code.clone())?;
        Some(Achievement {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            code: self.code,
            description: self.description,
            icon: self.icon,
        })
    }
}
