use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Administrator-curated challenge definition users can start from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChallengeTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ChallengeCategory,
    pub duration_days: i32,
    pub difficulty: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "challenge_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChallengeCategory {
    Sport,
    Creative,
    Study,
    Health,
    Productivity,
    Other,
}

impl Default for ChallengeCategory {
    fn default() -> Self {
        Self::Other
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<ChallengeCategory>,
    /// "title" (default), "difficulty" or "duration"
    pub sort: Option<String>,
}
