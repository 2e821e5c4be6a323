//! Return requests: customer-initiated, admin-adjudicated.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthUser};
use crate::domain::events::{self, DomainEvent};
use crate::domain::returns::{adjudicate, ReturnDecision};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderStatus, ReturnRequest};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReturnRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "a reason is required"))]
    pub reason: String,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(req): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<ReturnRequest>)> {
    req.validate()?;

    // Ownership and delivery are checked here, not left to the UI.
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND user_id = $2",
    )
    .bind(req.order_id)
    .bind(ctx.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound)?;

    if order.status != OrderStatus::Delivered {
        return Err(AppError::Validation(
            "only delivered orders can be returned".into(),
        ));
    }

    let request = sqlx::query_as::<_, ReturnRequest>(
        "INSERT INTO returns (id, user_id, order_id, reason, status, created_at) \
         VALUES ($1, $2, $3, $4, 'pending', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(ctx.user_id)
    .bind(req.order_id)
    .bind(&req.reason)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_own(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<ReturnRequest>>> {
    let requests = sqlx::query_as::<_, ReturnRequest>(
        "SELECT * FROM returns WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(ctx.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(requests))
}

pub async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<ReturnRequest>>> {
    let requests =
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM returns ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct Adjudication {
    pub decision: ReturnDecision,
    pub admin_note: Option<String>,
}

pub async fn decide(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Adjudication>,
) -> Result<Json<ReturnRequest>> {
    let mut tx = state.db.begin().await?;
    let request = sqlx::query_as::<_, ReturnRequest>(
        "SELECT * FROM returns WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    let next = adjudicate(request.status, body.decision)
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    let updated = sqlx::query_as::<_, ReturnRequest>(
        "UPDATE returns SET status = $2, admin_note = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(next)
    .bind(&body.admin_note)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    events::publish(
        state.nats.as_ref(),
        DomainEvent::ReturnDecided {
            return_id: updated.id,
            status: updated.status,
        },
    )
    .await;

    Ok(Json(updated))
}
