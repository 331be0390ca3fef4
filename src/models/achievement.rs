use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "achievement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AchievementType {
    Streak,
    Completion,
    Consistency,
    Variety,
}

/// An unlocked (or in-progress) badge. Identity key is (user, type, title);
/// progress and earned_at are frozen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Achievement {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: AchievementType,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub progress: i32,
    pub target: i32,
    pub earned_at: DateTime<Utc>,
}

impl Achievement {
    pub fn is_completed(&self) -> bool {
        self.progress >= self.target
    }

    pub fn progress_percentage(&self) -> i32 {
        if self.target > 0 {
            (self.progress as i64 * 100 / self.target as i64).min(100) as i32
        } else {
            100
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AchievementWithStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub is_completed: bool,
    pub progress_percentage: i32,
}

impl From<Achievement> for AchievementWithStatus {
    fn from(a: Achievement) -> Self {
        let is_completed = a.is_completed();
        let progress_percentage = a.progress_percentage();
        Self {
            achievement: a,
            is_completed,
            progress_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn achievement(progress: i32, target: i32) -> Achievement {
        Achievement {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: AchievementType::Streak,
            title: "Week of Discipline".into(),
            description: "Checked in 7 days in a row".into(),
            icon: "🔥".into(),
            progress,
            target,
            earned_at: Utc::now(),
        }
    }

    #[test]
    fn test_completed_when_progress_reaches_target() {
        assert!(achievement(7, 7).is_completed());
        assert!(achievement(9, 7).is_completed());
        assert!(!achievement(6, 7).is_completed());
    }

    #[test]
    fn test_progress_percentage_capped() {
        assert_eq!(achievement(3, 10).progress_percentage(), 30);
        assert_eq!(achievement(15, 10).progress_percentage(), 100);
    }

    #[test]
    fn test_progress_percentage_zero_target() {
        assert_eq!(achievement(0, 0).progress_percentage(), 100);
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_value(achievement(7, 7)).unwrap();
        assert_eq!(json["type"], "streak");
        assert!(json.get("kind").is_none());
    }
}
