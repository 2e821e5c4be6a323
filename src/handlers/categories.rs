//! Category management. Deleting a category leaves its products in place;
//! they keep the dangling slug reference until re-assigned.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::domain::slug::slugify;
use crate::error::{AppError, Result};
use crate::models::Category;
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY title")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(categories))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub image_url: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let slug = slugify(&payload.title);

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, title, slug, image_url, created_at) \
         VALUES ($1, $2, $3, $4, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.title)
    .bind(&slug)
    .bind(&payload.image_url)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "a category with this slug already exists"))?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<Category>> {
    payload.validate()?;

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET title = $2, image_url = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(&payload.image_url)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(category))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
