//! Automatic challenge completion: once the challenge window has elapsed,
//! an active challenge transitions to completed or failed depending on how
//! many days the user actually finished. Manual early completion is a
//! separate handler and does not go through this check.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::challenge::{ChallengeOverview, ChallengeStatus};

/// Decide whether an elapsed challenge should transition, without touching
/// the database. `None` means no transition applies: the challenge is not
/// active, has no duration, or its window has not elapsed yet.
pub fn resolve_outcome(challenge: &ChallengeOverview, today: NaiveDate) -> Option<ChallengeStatus> {
    if challenge.status != ChallengeStatus::Active {
        return None;
    }
    let duration = challenge.duration_days?;
    if challenge.days_passed(today) < duration as i64 {
        return None;
    }
    if challenge.completed_days >= duration {
        Some(ChallengeStatus::Completed)
    } else {
        Some(ChallengeStatus::Failed)
    }
}

/// Apply the transition if one is due. The update is guarded on
/// `status = 'active'` so a challenge already moved to a terminal state by a
/// concurrent request is never re-evaluated.
pub async fn check_and_complete(
    db: &PgPool,
    challenge: &ChallengeOverview,
    today: NaiveDate,
) -> AppResult<Option<ChallengeStatus>> {
    let Some(outcome) = resolve_outcome(challenge, today) else {
        return Ok(None);
    };

    let result = sqlx::query(
        r#"
        UPDATE user_challenges SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'active'
        "#,
    )
    .bind(challenge.id)
    .bind(outcome)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    tracing::info!(
        challenge_id = %challenge.id,
        user_id = %challenge.user_id,
        outcome = ?outcome,
        "Challenge window elapsed, status transitioned"
    );
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::ChallengeCategory;
    use chrono::Utc;
    use uuid::Uuid;

    fn challenge(
        status: ChallengeStatus,
        duration: Option<i32>,
        completed_days: i32,
    ) -> ChallengeOverview {
        ChallengeOverview {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: None,
            title: "Read daily".into(),
            description: String::new(),
            category: ChallengeCategory::Study,
            duration_days: duration,
            difficulty: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status,
            current_streak: 0,
            completed_days,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_all_days_done_completes() {
        let c = challenge(ChallengeStatus::Active, Some(10), 10);
        // past the 10-day window
        assert_eq!(
            resolve_outcome(&c, d(2026, 3, 15)),
            Some(ChallengeStatus::Completed)
        );
    }

    #[test]
    fn test_missed_days_fail() {
        let c = challenge(ChallengeStatus::Active, Some(10), 9);
        assert_eq!(
            resolve_outcome(&c, d(2026, 3, 15)),
            Some(ChallengeStatus::Failed)
        );
    }

    #[test]
    fn test_fires_exactly_on_last_day() {
        let c = challenge(ChallengeStatus::Active, Some(10), 10);
        // day 10 of 10 (inclusive counting: March 10th)
        assert_eq!(
            resolve_outcome(&c, d(2026, 3, 10)),
            Some(ChallengeStatus::Completed)
        );
        // day 9: window not elapsed yet
        assert_eq!(resolve_outcome(&c, d(2026, 3, 9)), None);
    }

    #[test]
    fn test_terminal_states_never_reevaluated() {
        for status in [
            ChallengeStatus::Completed,
            ChallengeStatus::Failed,
            ChallengeStatus::Paused,
        ] {
            let c = challenge(status, Some(10), 0);
            assert_eq!(resolve_outcome(&c, d(2026, 6, 1)), None);
        }
    }

    #[test]
    fn test_no_duration_no_transition() {
        let c = challenge(ChallengeStatus::Active, None, 100);
        assert_eq!(resolve_outcome(&c, d(2027, 1, 1)), None);
    }

    #[test]
    fn test_overachieving_still_completes() {
        let c = challenge(ChallengeStatus::Active, Some(10), 12);
        assert_eq!(
            resolve_outcome(&c, d(2026, 3, 20)),
            Some(ChallengeStatus::Completed)
        );
    }
}
