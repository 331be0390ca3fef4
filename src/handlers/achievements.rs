use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::achievement::{Achievement, AchievementWithStatus};
use crate::services::achievements;
use crate::AppState;

pub async fn list_achievements(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<AchievementWithStatus>>> {
    let rows = sqlx::query_as::<_, Achievement>(
        "SELECT * FROM achievements WHERE user_id = $1 ORDER BY earned_at DESC",
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Run the rule catalog and return what was newly unlocked. Empty when
/// nothing changed; safe to call from any page action.
pub async fn evaluate_achievements(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Achievement>>> {
    let created = achievements::evaluate(&state.db, auth_user.id).await?;
    Ok(Json(created))
}

/// Destructive backfill: wipe and re-derive every achievement for the user.
pub async fn recalculate_achievements(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let (deleted, created) = achievements::recalculate(&state.db, auth_user.id).await?;

    Ok(Json(serde_json::json!({
        "deleted": deleted,
        "created": created.len(),
        "achievements": created,
    })))
}
