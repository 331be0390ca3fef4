//! Achievement evaluation: a fixed, ordered catalog of rules scanned against
//! a per-user statistics snapshot. Creation is get-or-create keyed on
//! (user, type, title) via a uniqueness-constrained insert, so repeated or
//! concurrent evaluations can never duplicate a badge, and progress values
//! are frozen once a badge exists.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::achievement::{Achievement, AchievementType};
use crate::services::streaks;

/// Everything the rule catalog reads, gathered once per evaluation pass.
/// The join date is fetched first; if the user row is missing the whole
/// pass fails rather than applying a partial rule set.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    /// Check-in rows of any kind, completed or not.
    pub total_checkins: i64,
    /// Check-ins flagged completed, across all challenges.
    pub completed_checkins: i64,
    /// Consecutive completed days ending today, any challenge.
    pub current_streak: i64,
    /// Longest consecutive-day run in the whole history.
    pub max_streak: i64,
    pub completed_challenges: i64,
    pub distinct_categories: i64,
    /// Challenges whose resolved duration is at least 90 days.
    pub long_challenges: i64,
    /// Completed challenges where every single day was checked off.
    pub perfect_challenges: i64,
    pub days_since_join: i64,
}

pub struct Rule {
    pub title: &'static str,
    pub kind: AchievementType,
    pub icon: &'static str,
    pub description: &'static str,
    pub target: i64,
    pub progress: fn(&UserStats) -> i64,
}

impl Rule {
    pub fn unlocked(&self, stats: &UserStats) -> bool {
        (self.progress)(stats) >= self.target
    }
}

/// The rule catalog. Order is fixed; rules are mutually independent.
pub const CATALOG: &[Rule] = &[
    Rule {
        title: "First Step",
        kind: AchievementType::Streak,
        icon: "👣",
        description: "Logged a first challenge check-in",
        target: 1,
        progress: |s| s.total_checkins.min(1),
    },
    Rule {
        title: "Week of Discipline",
        kind: AchievementType::Streak,
        icon: "🔥",
        description: "Checked in 7 days in a row",
        target: 7,
        progress: |s| s.current_streak,
    },
    Rule {
        title: "First Success",
        kind: AchievementType::Completion,
        icon: "🎯",
        description: "Completed a first challenge",
        target: 1,
        progress: |s| s.completed_challenges,
    },
    Rule {
        title: "Variety Master",
        kind: AchievementType::Variety,
        icon: "🌈",
        description: "Tried challenges in 3+ categories",
        target: 3,
        progress: |s| s.distinct_categories,
    },
    Rule {
        title: "Experienced Player",
        kind: AchievementType::Completion,
        icon: "🏅",
        description: "Completed 5 challenges",
        target: 5,
        progress: |s| s.completed_challenges,
    },
    Rule {
        title: "Month With Us",
        kind: AchievementType::Consistency,
        icon: "📅",
        description: "30 days since joining",
        target: 30,
        progress: |s| s.days_since_join,
    },
    Rule {
        title: "Hundred Check-ins",
        kind: AchievementType::Streak,
        icon: "💯",
        description: "Logged 100 completed check-ins",
        target: 100,
        progress: |s| s.completed_checkins,
    },
    Rule {
        title: "Super Streak",
        kind: AchievementType::Streak,
        icon: "⚡",
        description: "30 consecutive days without a miss",
        target: 30,
        progress: |s| s.max_streak,
    },
    Rule {
        title: "Marathoner",
        kind: AchievementType::Consistency,
        icon: "🏃",
        description: "Started a challenge of 90+ days",
        target: 1,
        progress: |s| s.long_challenges,
    },
    Rule {
        title: "Perfect Execution",
        kind: AchievementType::Completion,
        icon: "⭐",
        description: "Finished a challenge at 100%",
        target: 1,
        progress: |s| s.perfect_challenges,
    },
    Rule {
        title: "Veteran",
        kind: AchievementType::Consistency,
        icon: "👴",
        description: "200 days since joining",
        target: 200,
        progress: |s| s.days_since_join,
    },
    Rule {
        title: "Challenge Master",
        kind: AchievementType::Completion,
        icon: "👑",
        description: "Completed 10 challenges",
        target: 10,
        progress: |s| s.completed_challenges,
    },
];

/// All completed check-in dates for a user, deduplicated, ascending.
pub async fn completed_dates(db: &PgPool, user_id: Uuid) -> AppResult<Vec<NaiveDate>> {
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT DISTINCT dc.date
        FROM daily_checkins dc
        JOIN user_challenges uc ON uc.id = dc.user_challenge_id
        WHERE uc.user_id = $1 AND dc.is_completed = true
        ORDER BY dc.date ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(dates)
}

pub async fn collect_stats(db: &PgPool, user_id: Uuid, today: NaiveDate) -> AppResult<UserStats> {
    // Join date first: two rules need it, and a missing user aborts the
    // whole pass rather than applying the remaining rules.
    let joined_at = sqlx::query_scalar::<_, chrono::DateTime<Utc>>(
        "SELECT created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("User not found".into()))?;
    let days_since_join = (Utc::now() - joined_at).num_days();

    let total_checkins = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM daily_checkins dc
        JOIN user_challenges uc ON uc.id = dc.user_challenge_id
        WHERE uc.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let completed_checkins = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM daily_checkins dc
        JOIN user_challenges uc ON uc.id = dc.user_challenge_id
        WHERE uc.user_id = $1 AND dc.is_completed = true
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let dates = completed_dates(db, user_id).await?;
    let current_streak = streaks::current_streak(&dates, today) as i64;
    let max_streak = streaks::longest_streak(&dates) as i64;

    let completed_challenges = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_challenges WHERE user_id = $1 AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let distinct_categories = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT COALESCE(t.category, uc.custom_category))
        FROM user_challenges uc
        LEFT JOIN challenge_templates t ON t.id = uc.template_id
        WHERE uc.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let long_challenges = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM user_challenges uc
        LEFT JOIN challenge_templates t ON t.id = uc.template_id
        WHERE uc.user_id = $1
          AND COALESCE(t.duration_days, uc.custom_duration) >= 90
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let perfect_challenges = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM user_challenges uc
        LEFT JOIN challenge_templates t ON t.id = uc.template_id
        WHERE uc.user_id = $1
          AND uc.status = 'completed'
          AND uc.completed_days = COALESCE(t.duration_days, uc.custom_duration)
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(UserStats {
        total_checkins,
        completed_checkins,
        current_streak,
        max_streak,
        completed_challenges,
        distinct_categories,
        long_challenges,
        perfect_challenges,
        days_since_join,
    })
}

/// Evaluate every rule for one user and create the achievements that are
/// newly unlocked. Existing achievements are left untouched (the insert is
/// a no-op on conflict), so calling this repeatedly is safe and the second
/// call for an unchanged user returns an empty list.
pub async fn evaluate(db: &PgPool, user_id: Uuid) -> AppResult<Vec<Achievement>> {
    let today = Utc::now().date_naive();
    let stats = collect_stats(db, user_id, today).await?;

    let mut created = Vec::new();
    for rule in CATALOG {
        if !rule.unlocked(&stats) {
            continue;
        }
        let progress = (rule.progress)(&stats);

        // Insert-or-ignore against the (user_id, type, title) unique index:
        // no check-then-create window, concurrent passes cannot both win.
        let inserted = sqlx::query_as::<_, Achievement>(
            r#"
            INSERT INTO achievements (id, user_id, type, title, description, icon, progress, target)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, type, title) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(rule.kind)
        .bind(rule.title)
        .bind(rule.description)
        .bind(rule.icon)
        .bind(progress as i32)
        .bind(rule.target as i32)
        .fetch_optional(db)
        .await?;

        if let Some(achievement) = inserted {
            tracing::info!(
                user_id = %user_id,
                title = rule.title,
                progress = progress,
                "Achievement unlocked"
            );
            created.push(achievement);
        }
    }

    Ok(created)
}

/// Wipe and re-derive all of a user's achievements. Used for backfills after
/// rule changes. The delete and the re-evaluation are separate statements;
/// a crash in between leaves the user with zero achievements until the next
/// evaluation runs. Not safe to run concurrently with itself for one user.
pub async fn recalculate(db: &PgPool, user_id: Uuid) -> AppResult<(u64, Vec<Achievement>)> {
    let deleted = sqlx::query("DELETE FROM achievements WHERE user_id = $1")
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    tracing::info!(user_id = %user_id, deleted = deleted, "Cleared achievements for recalculation");

    let created = evaluate(db, user_id).await?;
    tracing::info!(user_id = %user_id, created = created.len(), "Recalculation finished");

    Ok((deleted, created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn unlocked_titles(stats: &UserStats) -> Vec<&'static str> {
        CATALOG
            .iter()
            .filter(|r| r.unlocked(stats))
            .map(|r| r.title)
            .collect()
    }

    // ── catalog shape ────────────────────────────────────────────────────

    #[test]
    fn test_catalog_has_twelve_rules_in_order() {
        let titles: Vec<_> = CATALOG.iter().map(|r| r.title).collect();
        assert_eq!(
            titles,
            vec![
                "First Step",
                "Week of Discipline",
                "First Success",
                "Variety Master",
                "Experienced Player",
                "Month With Us",
                "Hundred Check-ins",
                "Super Streak",
                "Marathoner",
                "Perfect Execution",
                "Veteran",
                "Challenge Master",
            ]
        );
    }

    #[test]
    fn test_catalog_keys_are_unique() {
        let keys: HashSet<_> = CATALOG.iter().map(|r| (r.kind, r.title)).collect();
        assert_eq!(keys.len(), CATALOG.len());
    }

    #[test]
    fn test_nothing_unlocks_for_a_fresh_user() {
        assert!(unlocked_titles(&UserStats::default()).is_empty());
    }

    // ── individual rules ─────────────────────────────────────────────────

    #[test]
    fn test_first_step_needs_any_checkin() {
        let stats = UserStats {
            total_checkins: 1,
            ..Default::default()
        };
        assert_eq!(unlocked_titles(&stats), vec!["First Step"]);

        let rule = &CATALOG[0];
        assert_eq!((rule.progress)(&stats), 1);
        assert_eq!(rule.target, 1);
    }

    #[test]
    fn test_first_step_progress_stays_at_one() {
        let stats = UserStats {
            total_checkins: 250,
            ..Default::default()
        };
        assert_eq!((CATALOG[0].progress)(&stats), 1);
    }

    #[test]
    fn test_week_of_discipline_at_exactly_seven() {
        let rule = CATALOG
            .iter()
            .find(|r| r.title == "Week of Discipline")
            .unwrap();
        let six = UserStats {
            current_streak: 6,
            ..Default::default()
        };
        let seven = UserStats {
            current_streak: 7,
            ..Default::default()
        };
        assert!(!rule.unlocked(&six));
        assert!(rule.unlocked(&seven));
        assert_eq!((rule.progress)(&seven), 7);
        assert_eq!(rule.target, 7);
    }

    #[test]
    fn test_completion_ladder() {
        let stats = UserStats {
            completed_challenges: 5,
            ..Default::default()
        };
        let titles = unlocked_titles(&stats);
        assert!(titles.contains(&"First Success"));
        assert!(titles.contains(&"Experienced Player"));
        assert!(!titles.contains(&"Challenge Master"));

        let ten = UserStats {
            completed_challenges: 10,
            ..Default::default()
        };
        assert!(unlocked_titles(&ten).contains(&"Challenge Master"));
    }

    #[test]
    fn test_join_date_drives_both_tenure_rules() {
        let month = UserStats {
            days_since_join: 45,
            ..Default::default()
        };
        let titles = unlocked_titles(&month);
        assert!(titles.contains(&"Month With Us"));
        assert!(!titles.contains(&"Veteran"));

        let veteran = UserStats {
            days_since_join: 200,
            ..Default::default()
        };
        let titles = unlocked_titles(&veteran);
        assert!(titles.contains(&"Month With Us"));
        assert!(titles.contains(&"Veteran"));
    }

    #[test]
    fn test_super_streak_uses_max_not_current() {
        let stats = UserStats {
            current_streak: 0,
            max_streak: 31,
            ..Default::default()
        };
        let titles = unlocked_titles(&stats);
        assert!(titles.contains(&"Super Streak"));
        assert!(!titles.contains(&"Week of Discipline"));
    }

    #[test]
    fn test_everything_unlocks_at_once() {
        // rules are independent: one pass can create the full set
        let stats = UserStats {
            total_checkins: 500,
            completed_checkins: 400,
            current_streak: 12,
            max_streak: 40,
            completed_challenges: 12,
            distinct_categories: 4,
            long_challenges: 2,
            perfect_challenges: 3,
            days_since_join: 365,
        };
        assert_eq!(unlocked_titles(&stats).len(), CATALOG.len());
    }
}
