use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::achievement::Achievement;
use crate::services::{achievements, streaks};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub active_challenges: i64,
    pub completed_challenges: i64,
    pub failed_challenges: i64,
    pub total_days_completed: i64,
    pub total_checkins: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    /// Mean self-rating across rated check-ins; 0.0 when none are rated.
    pub average_rating: f64,
    pub achievements_unlocked: i64,
    /// Achievements created by the evaluation this view triggered.
    pub new_achievements: Vec<Achievement>,
}

/// Profile statistics. Viewing the profile is one of the page actions that
/// triggers achievement evaluation, so tenure badges unlock without any
/// check-in activity.
pub async fn get_profile_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileStats>> {
    let new_achievements = achievements::evaluate(&state.db, auth_user.id).await?;

    let (active, completed, failed, total_days) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'active'),
            COUNT(*) FILTER (WHERE status = 'completed'),
            COUNT(*) FILTER (WHERE status = 'failed'),
            COALESCE(SUM(completed_days), 0)
        FROM user_challenges
        WHERE user_id = $1
        "#,
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    let total_checkins = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM daily_checkins dc
        JOIN user_challenges uc ON uc.id = dc.user_challenge_id
        WHERE uc.user_id = $1 AND dc.is_completed = true
        "#,
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    // AVG over zero rated rows is NULL, never a division error
    let average_rating = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(AVG(dc.rating), 0)::float8
        FROM daily_checkins dc
        JOIN user_challenges uc ON uc.id = dc.user_challenge_id
        WHERE uc.user_id = $1 AND dc.rating IS NOT NULL
        "#,
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    let dates = achievements::completed_dates(&state.db, auth_user.id).await?;
    let today = Utc::now().date_naive();
    let current_streak = streaks::current_streak(&dates, today);
    let longest_streak = streaks::longest_streak(&dates);

    let achievements_unlocked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM achievements WHERE user_id = $1",
    )
    .bind(auth_user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ProfileStats {
        active_challenges: active,
        completed_challenges: completed,
        failed_challenges: failed,
        total_days_completed: total_days,
        total_checkins,
        current_streak,
        longest_streak,
        average_rating,
        achievements_unlocked,
        new_achievements,
    }))
}
