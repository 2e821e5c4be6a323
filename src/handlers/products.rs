//! Product catalog: public browsing, admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, PaginatedResponse};
use crate::auth::AdminUser;
use crate::domain::slug::slugify;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%') \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&params.category)
    .bind(&params.search)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products \
         WHERE ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%')",
    )
    .bind(&params.category)
    .bind(&params.search)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(PaginatedResponse {
        data: products,
        total,
        page: params.page(),
    }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
    pub material: Option<String>,
    pub dimensions: Option<String>,
    pub is_personalized: Option<bool>,
}

impl ProductPayload {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if self.price <= Decimal::ZERO {
            return Err(AppError::Validation("price must be positive".into()));
        }
        if let Some(sale) = self.sale_price {
            if !sale.is_zero() && sale >= self.price {
                return Err(AppError::Validation(
                    "sale_price must be below the list price".into(),
                ));
            }
        }
        if self.stock_quantity.unwrap_or(0) < 0 {
            return Err(AppError::Validation("stock_quantity cannot be negative".into()));
        }
        Ok(())
    }
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>)> {
    payload.check()?;
    let slug = slugify(&payload.title);

    // Slug collisions get a short random suffix instead of failing the form.
    let product = match insert_product(&state.db, &payload, &slug).await {
        Ok(p) => p,
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
            let suffix: u16 = rand::random();
            insert_product(&state.db, &payload, &format!("{slug}-{suffix}")).await?
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(product)))
}

async fn insert_product(
    db: &sqlx::PgPool,
    payload: &ProductPayload,
    slug: &str,
) -> sqlx::Result<Product> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products \
         (id, title, slug, description, price, sale_price, stock_quantity, category, \
          images, material, dimensions, is_personalized, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.title)
    .bind(slug)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.sale_price)
    .bind(payload.stock_quantity.unwrap_or(0))
    .bind(&payload.category)
    .bind(payload.images.clone().unwrap_or_default())
    .bind(&payload.material)
    .bind(&payload.dimensions)
    .bind(payload.is_personalized.unwrap_or(false))
    .fetch_one(db)
    .await
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>> {
    payload.check()?;

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET title = $2, description = $3, price = $4, sale_price = $5, \
         stock_quantity = $6, category = $7, images = $8, material = $9, dimensions = $10, \
         is_personalized = $11, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.sale_price)
    .bind(payload.stock_quantity.unwrap_or(0))
    .bind(&payload.category)
    .bind(payload.images.clone().unwrap_or_default())
    .bind(&payload.material)
    .bind(&payload.dimensions)
    .bind(payload.is_personalized.unwrap_or(false))
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(product))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
