//! Support tickets: threaded conversation with live delivery.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthContext, AuthUser};
use crate::domain::events::{self, DomainEvent};
use crate::domain::ticket::ensure_reply_allowed;
use crate::error::{AppError, Result};
use crate::models::{SupportMessage, SupportTicket, TicketPriority, TicketStatus};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 5, message = "subject must be at least 5 characters"))]
    pub subject: String,
    #[validate(length(min = 20, message = "message must be at least 20 characters"))]
    pub message: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Serialize)]
pub struct TicketWithMessages {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub messages: Vec<SupportMessage>,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketWithMessages>)> {
    req.validate()?;

    let mut tx = state.db.begin().await?;
    let ticket = sqlx::query_as::<_, SupportTicket>(
        "INSERT INTO support_tickets (id, user_id, subject, priority, status, created_at) \
         VALUES ($1, $2, $3, $4, 'open', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(ctx.user_id)
    .bind(&req.subject)
    .bind(req.priority)
    .fetch_one(&mut *tx)
    .await?;

    let first = sqlx::query_as::<_, SupportMessage>(
        "INSERT INTO support_messages (id, ticket_id, sender_id, message, is_admin_reply, created_at) \
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(ticket.id)
    .bind(ctx.user_id)
    .bind(&req.message)
    .bind(ctx.is_admin())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    state.mailer.ticket_created(&ticket);
    state.feed.publish(&first);
    events::publish(
        state.nats.as_ref(),
        DomainEvent::TicketMessageCreated {
            ticket_id: ticket.id,
            message_id: first.id,
            is_admin_reply: first.is_admin_reply,
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(TicketWithMessages {
            ticket,
            messages: vec![first],
        }),
    ))
}

/// Customers see their own tickets; staff see everything.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<Vec<SupportTicket>>> {
    let tickets = if ctx.is_admin() {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets ORDER BY created_at DESC",
        )
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(ctx.user_id)
        .fetch_all(&state.db)
        .await?
    };
    Ok(Json(tickets))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithMessages>> {
    let ticket = load_for_participant(&state, &ctx, id).await?;
    let messages = fetch_history(&state, id).await?;
    Ok(Json(TicketWithMessages { ticket, messages }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub message: String,
}

pub async fn reply(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<SupportMessage>)> {
    req.validate()?;

    // The closed-gate and the participant check ride inside the insert, so
    // no message row can ever land on a closed ticket.
    let inserted = sqlx::query_as::<_, SupportMessage>(
        "INSERT INTO support_messages (id, ticket_id, sender_id, message, is_admin_reply, created_at) \
         SELECT $1, t.id, $3, $4, $5, NOW() FROM support_tickets t \
         WHERE t.id = $2 AND t.status <> 'closed' AND (t.user_id = $3 OR $6) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(id)
    .bind(ctx.user_id)
    .bind(&req.message)
    .bind(ctx.is_admin())
    .bind(ctx.is_admin())
    .fetch_optional(&state.db)
    .await?;

    let Some(message) = inserted else {
        // Distinguish "closed" from "not yours"/"missing" for the caller.
        let ticket = load_for_participant(&state, &ctx, id).await?;
        ensure_reply_allowed(ticket.status).map_err(|e| AppError::Conflict(e.to_string()))?;
        return Err(AppError::NotFound);
    };

    state.feed.publish(&message);
    events::publish(
        state.nats.as_ref(),
        DomainEvent::TicketMessageCreated {
            ticket_id: id,
            message_id: message.id,
            is_admin_reply: message.is_admin_reply,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: TicketStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<SupportTicket>> {
    let ticket = sqlx::query_as::<_, SupportTicket>(
        "UPDATE support_tickets SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(update.status)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound)?;
    Ok(Json(ticket))
}

/// Live message feed. Subscribes before fetching history, then replays
/// history and filters already-delivered ids out of the live tail, so a
/// message inserted during the fetch is neither lost nor duplicated.
pub async fn stream(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    load_for_participant(&state, &ctx, id).await?;

    let rx = state.feed.subscribe(id);
    let history = fetch_history(&state, id).await?;
    let seen: HashSet<Uuid> = history.iter().map(|m| m.id).collect();

    let live = BroadcastStream::new(rx)
        .filter_map(|r| futures::future::ready(r.ok()))
        .filter(move |m| futures::future::ready(!seen.contains(&m.id)));

    let events = stream::iter(history)
        .chain(live)
        .filter_map(|m| {
            futures::future::ready(Event::default().event("message").json_data(&m).ok())
        })
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn load_for_participant(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
) -> Result<SupportTicket> {
    let ticket = sqlx::query_as::<_, SupportTicket>(
        "SELECT * FROM support_tickets WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound)?;

    if !ctx.is_admin() && ticket.user_id != ctx.user_id {
        return Err(AppError::NotFound);
    }
    Ok(ticket)
}

async fn fetch_history(state: &AppState, ticket_id: Uuid) -> Result<Vec<SupportMessage>> {
    let messages = sqlx::query_as::<_, SupportMessage>(
        "SELECT * FROM support_messages WHERE ticket_id = $1 ORDER BY created_at, id",
    )
    .bind(ticket_id)
    .fetch_all(&state.db)
    .await?;
    Ok(messages)
}
