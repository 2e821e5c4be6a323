//! Order tracking for customers, lifecycle administration for staff.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::{ListParams, PaginatedResponse};
use crate::auth::{AdminUser, AuthUser};
use crate::domain::events::{self, DomainEvent};
use crate::domain::order::{self, OrderEvent};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderStatus};
use crate::AppState;

pub async fn list_own(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<Order>>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(ctx.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(orders))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)?;

    if !ctx.is_admin() && order.user_id != Some(ctx.user_id) {
        return Err(AppError::NotFound);
    }
    Ok(Json(order))
}

pub async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(PaginatedResponse {
        data: orders,
        total,
        page: params.page(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

/// Status change plus any shipment metadata land in one transaction; the
/// row is locked so concurrent admin updates serialize instead of racing.
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let event = OrderEvent::for_target(update.status, update.tracking_number, update.carrier)
        .map_err(AppError::from)?;

    let mut tx = state.db.begin().await?;
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

    let transition = order::apply(order.status, event).map_err(AppError::from)?;

    let updated = match &transition.shipment {
        Some(shipment) => {
            sqlx::query_as::<_, Order>(
                "UPDATE orders SET status = $2, tracking_number = $3, carrier = $4, \
                 updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(order.id)
            .bind(transition.next)
            .bind(&shipment.tracking_number)
            .bind(&shipment.carrier)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, Order>(
                "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(order.id)
            .bind(transition.next)
            .fetch_one(&mut *tx)
            .await?
        }
    };
    tx.commit().await?;

    events::publish(
        state.nats.as_ref(),
        DomainEvent::OrderStatusChanged {
            order_id: order.id,
            from: order.status,
            to: updated.status,
        },
    )
    .await;

    Ok(Json(updated))
}
