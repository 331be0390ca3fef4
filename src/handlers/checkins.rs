use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::challenges::fetch_overview;
use crate::models::checkin::{CheckinQuery, CheckinRequest, CheckinResponse, DailyCheckin};
use crate::services::{achievements, lifecycle, streaks};
use crate::AppState;

/// Record (or amend) the check-in for one day of a challenge. Upserts on
/// the (challenge, date) unique key, refreshes the challenge counters, then
/// runs the lifecycle check and achievement evaluation in the same request.
pub async fn upsert_checkin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
    Json(body): Json<CheckinRequest>,
) -> AppResult<Json<CheckinResponse>> {
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    let today = Utc::now().date_naive();
    let date = body.date.unwrap_or(today);

    // Same-day record with a small grace window for timezone edges
    let diff = (date - today).num_days().abs();
    if diff > 1 {
        return Err(AppError::Validation(
            "date must be within ±1 day of today".into(),
        ));
    }
    if date < challenge.start_date {
        return Err(AppError::Validation(
            "date is before the challenge started".into(),
        ));
    }

    if let Some(rating) = body.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".into()));
        }
    }

    let checkin = sqlx::query_as::<_, DailyCheckin>(
        r#"
        INSERT INTO daily_checkins (id, user_challenge_id, date, is_completed, rating, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_challenge_id, date) DO UPDATE SET
            is_completed = $4,
            rating = $5,
            note = $6
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(challenge.id)
    .bind(date)
    .bind(body.is_completed)
    .bind(body.rating)
    .bind(body.note.as_deref().unwrap_or(""))
    .fetch_one(&state.db)
    .await?;

    // Re-derive the counters from the check-in rows themselves: the count
    // subquery is atomic, so concurrent check-ins on one challenge cannot
    // lose an update.
    let challenge_dates = sqlx::query_scalar::<_, chrono::NaiveDate>(
        r#"
        SELECT DISTINCT date FROM daily_checkins
        WHERE user_challenge_id = $1 AND is_completed = true
        ORDER BY date ASC
        "#,
    )
    .bind(challenge.id)
    .fetch_all(&state.db)
    .await?;
    let current_streak = streaks::current_streak(&challenge_dates, today);

    sqlx::query(
        r#"
        UPDATE user_challenges SET
            completed_days = (
                SELECT COUNT(*) FROM daily_checkins
                WHERE user_challenge_id = $1 AND is_completed = true
            ),
            current_streak = $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(challenge.id)
    .bind(current_streak)
    .execute(&state.db)
    .await?;

    // Lifecycle check on the refreshed row, then achievements
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;
    let transition = lifecycle::check_and_complete(&state.db, &challenge, today).await?;
    let new_achievements = achievements::evaluate(&state.db, auth_user.id).await?;

    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    Ok(Json(CheckinResponse {
        checkin,
        challenge: challenge.with_progress(today),
        transition,
        new_achievements,
    }))
}

pub async fn list_checkins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
    Query(query): Query<CheckinQuery>,
) -> AppResult<Json<Vec<DailyCheckin>>> {
    // Ownership check
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    let start = query.start_date.unwrap_or(challenge.start_date);
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let checkins = sqlx::query_as::<_, DailyCheckin>(
        r#"
        SELECT * FROM daily_checkins
        WHERE user_challenge_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(challenge.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(checkins))
}
