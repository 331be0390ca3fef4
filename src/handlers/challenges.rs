use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::challenge::{
    ChallengeListQuery, ChallengeOverview, ChallengeWithProgress, CustomChallengeRequest,
    StartChallengeRequest,
};
use crate::models::checkin::{CalendarDay, DailyCheckin};
use crate::services::achievements;
use crate::AppState;

/// Resolves title/category/duration/difficulty from the template when the
/// challenge is templated, from the custom fields otherwise.
pub const OVERVIEW_SELECT: &str = r#"
    SELECT uc.id, uc.user_id, uc.template_id,
           COALESCE(t.title, uc.custom_title, '') AS title,
           COALESCE(t.description, uc.custom_description, '') AS description,
           COALESCE(t.category, uc.custom_category, 'other'::challenge_category) AS category,
           COALESCE(t.duration_days, uc.custom_duration) AS duration_days,
           COALESCE(t.difficulty, uc.custom_difficulty, 2) AS difficulty,
           uc.start_date, uc.status, uc.current_streak, uc.completed_days,
           uc.notes, uc.created_at
    FROM user_challenges uc
    LEFT JOIN challenge_templates t ON t.id = uc.template_id
"#;

/// Load one challenge, scoped to its owner.
pub async fn fetch_overview(
    db: &sqlx::PgPool,
    challenge_id: Uuid,
    user_id: Uuid,
) -> AppResult<ChallengeOverview> {
    let sql = format!("{} WHERE uc.id = $1 AND uc.user_id = $2", OVERVIEW_SELECT);
    sqlx::query_as::<_, ChallengeOverview>(&sql)
        .bind(challenge_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Challenge not found".into()))
}

pub async fn list_challenges(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ChallengeListQuery>,
) -> AppResult<Json<Vec<ChallengeWithProgress>>> {
    let sql = format!(
        r#"{} WHERE uc.user_id = $1
             AND ($2::challenge_status IS NULL OR uc.status = $2)
           ORDER BY uc.start_date DESC, uc.created_at DESC"#,
        OVERVIEW_SELECT
    );

    let challenges = sqlx::query_as::<_, ChallengeOverview>(&sql)
        .bind(auth_user.id)
        .bind(query.status)
        .fetch_all(&state.db)
        .await?;

    let today = Utc::now().date_naive();
    let result = challenges
        .into_iter()
        .map(|c| c.with_progress(today))
        .collect();

    Ok(Json(result))
}

pub async fn get_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
) -> AppResult<Json<ChallengeWithProgress>> {
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;
    Ok(Json(challenge.with_progress(Utc::now().date_naive())))
}

/// Start a challenge from a template. One active instance per template.
pub async fn start_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<StartChallengeRequest>,
) -> AppResult<Json<ChallengeWithProgress>> {
    let template = sqlx::query_as::<_, crate::models::template::ChallengeTemplate>(
        "SELECT * FROM challenge_templates WHERE id = $1 AND is_active = true",
    )
    .bind(body.template_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Challenge template not found".into()))?;

    let already_running = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM user_challenges
        WHERE user_id = $1 AND template_id = $2 AND status = 'active'
        "#,
    )
    .bind(auth_user.id)
    .bind(template.id)
    .fetch_one(&state.db)
    .await?;

    if already_running > 0 {
        return Err(AppError::Conflict(
            "You are already running this challenge".into(),
        ));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO user_challenges (id, user_id, template_id, start_date, status, notes)
        VALUES ($1, $2, $3, $4, 'active', $5)
        "#,
    )
    .bind(id)
    .bind(auth_user.id)
    .bind(template.id)
    .bind(Utc::now().date_naive())
    .bind(body.notes.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await?;

    tracing::info!(
        user_id = %auth_user.id,
        template_id = %template.id,
        challenge_id = %id,
        "Challenge started"
    );

    let challenge = fetch_overview(&state.db, id, auth_user.id).await?;
    Ok(Json(challenge.with_progress(Utc::now().date_naive())))
}

/// Create a self-defined challenge (no template).
pub async fn create_custom_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CustomChallengeRequest>,
) -> AppResult<Json<ChallengeWithProgress>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO user_challenges
            (id, user_id, custom_title, custom_description, custom_category,
             custom_duration, custom_difficulty, start_date, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9)
        "#,
    )
    .bind(id)
    .bind(auth_user.id)
    .bind(&body.title)
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.category)
    .bind(body.duration_days)
    .bind(body.difficulty.unwrap_or(2))
    .bind(Utc::now().date_naive())
    .bind(body.notes.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, challenge_id = %id, "Custom challenge created");

    let challenge = fetch_overview(&state.db, id, auth_user.id).await?;
    Ok(Json(challenge.with_progress(Utc::now().date_naive())))
}

/// Manual early completion. Force-sets `completed` regardless of the day
/// count; distinct from the automatic lifecycle check that runs after
/// check-ins.
pub async fn complete_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    sqlx::query(
        r#"
        UPDATE user_challenges SET status = 'completed', updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(challenge.id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    tracing::info!(
        user_id = %auth_user.id,
        challenge_id = %challenge.id,
        "Challenge completed manually"
    );

    let new_achievements = achievements::evaluate(&state.db, auth_user.id).await?;
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    Ok(Json(serde_json::json!({
        "challenge": challenge.with_progress(Utc::now().date_naive()),
        "new_achievements": new_achievements,
    })))
}

/// Day-by-day progress view over the challenge window.
pub async fn challenge_calendar(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
) -> AppResult<Json<Vec<CalendarDay>>> {
    let challenge = fetch_overview(&state.db, challenge_id, auth_user.id).await?;

    let today = Utc::now().date_naive();
    // Open-ended challenges show up to today
    let end = challenge.end_date().unwrap_or(today).max(challenge.start_date);

    let checkins = sqlx::query_as::<_, DailyCheckin>(
        r#"
        SELECT * FROM daily_checkins
        WHERE user_challenge_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date ASC
        "#,
    )
    .bind(challenge.id)
    .bind(challenge.start_date)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let mut days = Vec::new();
    let mut date = challenge.start_date;
    while date <= end {
        let checkin = checkins.iter().find(|c| c.date == date);
        days.push(CalendarDay {
            date,
            is_completed: checkin.map(|c| c.is_completed).unwrap_or(false),
            rating: checkin.and_then(|c| c.rating),
            note: checkin.map(|c| c.note.clone()).unwrap_or_default(),
        });
        date += Duration::days(1);
    }

    Ok(Json(days))
}

/// Purges terminal challenges past the retention window every interval tick.
pub fn spawn_retention_worker(db: sqlx::PgPool, retention_days: i64, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let threshold = Utc::now().date_naive() - Duration::days(retention_days);
            match purge_old_challenges(&db, threshold).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(purged = count, "Retention: purged old challenges");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Retention worker error");
                }
            }
        }
    });
}

async fn purge_old_challenges(
    db: &sqlx::PgPool,
    threshold: NaiveDate,
) -> Result<u64, sqlx::Error> {
    // Check-ins go with the challenge (CASCADE); achievements are untouched.
    let result = sqlx::query(
        r#"
        DELETE FROM user_challenges
        WHERE status IN ('completed', 'failed') AND start_date < $1
        "#,
    )
    .bind(threshold)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}
