use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::achievement::Achievement;
use crate::models::challenge::{ChallengeStatus, ChallengeWithProgress};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyCheckin {
    pub id: Uuid,
    pub user_challenge_id: Uuid,
    pub date: NaiveDate,
    pub is_completed: bool,
    pub rating: Option<i32>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    /// Defaults to today; must be within ±1 day of server-now.
    pub date: Option<NaiveDate>,
    pub is_completed: bool,
    pub rating: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckinQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Everything a check-in submission can change, in one response: the saved
/// check-in, the refreshed challenge, a lifecycle transition if one fired,
/// and any achievements unlocked by this action.
#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub checkin: DailyCheckin,
    pub challenge: ChallengeWithProgress,
    pub transition: Option<ChallengeStatus>,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_completed: bool,
    pub rating: Option<i32>,
    pub note: String,
}
