use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::template::{ChallengeTemplate, TemplateQuery};
use crate::AppState;

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> AppResult<Json<Vec<ChallengeTemplate>>> {
    // ORDER BY is picked from a fixed whitelist, never from raw input
    let order_by = match query.sort.as_deref() {
        Some("difficulty") => "difficulty ASC, title ASC",
        Some("duration") => "duration_days ASC, title ASC",
        _ => "title ASC",
    };

    let sql = format!(
        r#"
        SELECT * FROM challenge_templates
        WHERE is_active = true
          AND ($1::challenge_category IS NULL OR category = $1)
        ORDER BY {}
        "#,
        order_by
    );

    let templates = sqlx::query_as::<_, ChallengeTemplate>(&sql)
        .bind(query.category)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(templates))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> AppResult<Json<ChallengeTemplate>> {
    let template = sqlx::query_as::<_, ChallengeTemplate>(
        "SELECT * FROM challenge_templates WHERE id = $1 AND is_active = true",
    )
    .bind(template_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Challenge template not found".into()))?;

    Ok(Json(template))
}
