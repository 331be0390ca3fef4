use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::template::ChallengeCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "challenge_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Active,
    Completed,
    Failed,
    Paused,
}

/// One user's attempt at a challenge, with title/category/duration already
/// resolved from the template or the custom fields (COALESCE in the query).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChallengeOverview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: ChallengeCategory,
    pub duration_days: Option<i32>,
    pub difficulty: i32,
    pub start_date: NaiveDate,
    pub status: ChallengeStatus,
    pub current_streak: i32,
    pub completed_days: i32,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl ChallengeOverview {
    /// Last day of the challenge, inclusive: day 1 is the start date.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.duration_days
            .map(|d| self.start_date + Duration::days(d as i64 - 1))
    }

    /// Days elapsed since the start, counting the start date itself.
    /// Clamped to [0, duration] when a duration is defined.
    pub fn days_passed(&self, today: NaiveDate) -> i64 {
        let days = (today - self.start_date).num_days() + 1;
        match self.duration_days {
            Some(d) => days.clamp(0, d as i64),
            None => days.max(0),
        }
    }

    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.end_date().map(|end| (end - today).num_days().max(0))
    }

    /// Share of the challenge window already behind the user, in percent.
    pub fn progress_percentage(&self, today: NaiveDate) -> i32 {
        match self.duration_days {
            Some(d) if d > 0 => (self.days_passed(today) * 100 / d as i64).min(100) as i32,
            _ => 0,
        }
    }

    /// Share of days actually completed, in percent. 0 when no duration.
    pub fn completion_percentage(&self) -> i32 {
        match self.duration_days {
            Some(d) if d > 0 => (self.completed_days as i64 * 100 / d as i64).min(100) as i32,
            _ => 0,
        }
    }

    pub fn with_progress(self, today: NaiveDate) -> ChallengeWithProgress {
        let end_date = self.end_date();
        let days_passed = self.days_passed(today);
        let days_left = self.days_left(today);
        let progress_percentage = self.progress_percentage(today);
        let completion_percentage = self.completion_percentage();
        ChallengeWithProgress {
            challenge: self,
            end_date,
            days_passed,
            days_left,
            progress_percentage,
            completion_percentage,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChallengeWithProgress {
    #[serde(flatten)]
    pub challenge: ChallengeOverview,
    pub end_date: Option<NaiveDate>,
    pub days_passed: i64,
    pub days_left: Option<i64>,
    pub progress_percentage: i32,
    pub completion_percentage: i32,
}

#[derive(Debug, Deserialize)]
pub struct StartChallengeRequest {
    pub template_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomChallengeRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    pub category: Option<ChallengeCategory>,

    #[validate(range(min = 1, max = 3650, message = "Duration must be 1-3650 days"))]
    pub duration_days: Option<i32>,

    #[validate(range(min = 1, max = 3, message = "Difficulty must be 1-3"))]
    pub difficulty: Option<i32>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeListQuery {
    pub status: Option<ChallengeStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(start: NaiveDate, duration: Option<i32>, completed_days: i32) -> ChallengeOverview {
        ChallengeOverview {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: None,
            title: "Morning run".into(),
            description: String::new(),
            category: ChallengeCategory::Sport,
            duration_days: duration,
            difficulty: 2,
            start_date: start,
            status: ChallengeStatus::Active,
            current_streak: 0,
            completed_days,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── end_date / days_passed ───────────────────────────────────────────

    #[test]
    fn test_end_date_is_inclusive() {
        let c = challenge(d(2026, 3, 1), Some(10), 0);
        // day 1 = March 1st, day 10 = March 10th
        assert_eq!(c.end_date(), Some(d(2026, 3, 10)));
    }

    #[test]
    fn test_end_date_without_duration() {
        let c = challenge(d(2026, 3, 1), None, 0);
        assert_eq!(c.end_date(), None);
    }

    #[test]
    fn test_days_passed_counts_start_day() {
        let c = challenge(d(2026, 3, 1), Some(10), 0);
        assert_eq!(c.days_passed(d(2026, 3, 1)), 1);
        assert_eq!(c.days_passed(d(2026, 3, 5)), 5);
    }

    #[test]
    fn test_days_passed_clamped_to_duration() {
        let c = challenge(d(2026, 3, 1), Some(10), 0);
        assert_eq!(c.days_passed(d(2026, 4, 20)), 10);
    }

    #[test]
    fn test_days_passed_before_start_is_zero() {
        let c = challenge(d(2026, 3, 10), Some(10), 0);
        assert_eq!(c.days_passed(d(2026, 3, 1)), 0);
    }

    #[test]
    fn test_days_left() {
        let c = challenge(d(2026, 3, 1), Some(10), 0);
        assert_eq!(c.days_left(d(2026, 3, 8)), Some(2));
        assert_eq!(c.days_left(d(2026, 3, 10)), Some(0));
        assert_eq!(c.days_left(d(2026, 3, 20)), Some(0));
    }

    // ── percentages ──────────────────────────────────────────────────────

    #[test]
    fn test_completion_percentage() {
        let c = challenge(d(2026, 3, 1), Some(10), 7);
        assert_eq!(c.completion_percentage(), 70);
    }

    #[test]
    fn test_completion_percentage_capped_at_100() {
        let c = challenge(d(2026, 3, 1), Some(10), 14);
        assert_eq!(c.completion_percentage(), 100);
    }

    #[test]
    fn test_percentages_without_duration_are_zero() {
        let c = challenge(d(2026, 3, 1), None, 7);
        assert_eq!(c.completion_percentage(), 0);
        assert_eq!(c.progress_percentage(d(2026, 3, 5)), 0);
    }

    #[test]
    fn test_progress_percentage_midway() {
        let c = challenge(d(2026, 3, 1), Some(10), 0);
        assert_eq!(c.progress_percentage(d(2026, 3, 5)), 50);
    }
}
