//! Checkout pipeline: re-price the cart from the catalog, persist a pending
//! order, exchange a signed request for a gateway iframe token. Steps run
//! strictly in that sequence and each one fails closed.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Json as Jsonb;
use uuid::Uuid;
use validator::Validate;

use crate::auth::OptionalUser;
use crate::domain::events::{self, DomainEvent};
use crate::domain::order::{self, new_merchant_oid, OrderEvent};
use crate::domain::pricing::{self, basket_descriptor, price_cart, CartLine};
use crate::error::{AppError, Result};
use crate::models::{Order, OrderStatus, Product, ShippingAddress};
use crate::paytr::{self, TokenRequest};
use crate::AppState;

const NO_INSTALLMENT: u8 = 0;
const MAX_INSTALLMENT: u8 = 0;
const CURRENCY: &str = "TL";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 5, message = "a phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "district is required"))]
    pub district: String,
    #[validate(length(min = 5, message = "a delivery address is required"))]
    pub address: String,
    pub zip_code: Option<String>,
    #[validate]
    pub items: Vec<CheckoutItem>,
    /// Optional client-generated token; resubmitting with the same token
    /// reuses the existing order instead of creating a duplicate.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutItem {
    pub id: Uuid,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 100, message = "personalization note is limited to 100 characters"))]
    pub note: Option<String>,
}

pub async fn checkout(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    req.validate()?;
    if state.config.paytr.is_none() {
        return Err(AppError::PaymentMisconfigured);
    }

    // Idempotent replay: same key, same order, fresh one-time token.
    if let Some(key) = &req.idempotency_key {
        let existing = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(&state.db)
        .await?;
        if let Some(order) = existing {
            let token = issue_token(&state, &headers, &req, &order).await?;
            return Ok(Json(respond(&order, token)));
        }
    }

    let ids: Vec<Uuid> = req.items.iter().map(|i| i.id).collect();
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&state.db)
        .await?;

    let cart: Vec<CartLine> = req
        .items
        .iter()
        .map(|i| CartLine {
            product_id: i.id,
            quantity: i.quantity,
            note: i.note.clone(),
        })
        .collect();

    let priced = price_cart(&products, &cart);
    if priced.is_empty() {
        return Err(AppError::InvalidCart);
    }

    let shipping_address = ShippingAddress {
        name: format!("{} {}", req.first_name.trim(), req.last_name.trim()),
        phone: req.phone.clone(),
        city: req.city.clone(),
        district: req.district.clone(),
        address: req.address.clone(),
        zip: req.zip_code.clone().unwrap_or_default(),
    };

    // Stock decrement and order insert commit or roll back together.
    let mut tx = state.db.begin().await?;
    for line in &priced.lines {
        let updated = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2 \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "insufficient stock for {}",
                line.title
            )));
        }
    }

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders \
         (id, user_id, status, total, merchant_oid, shipping_address, items, idempotency_key, \
          created_at, updated_at) \
         VALUES ($1, $2, 'pending_payment', $3, $4, $5, $6, $7, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.map(|u| u.user_id))
    .bind(priced.total)
    .bind(new_merchant_oid())
    .bind(Jsonb(&shipping_address))
    .bind(Jsonb(&priced.lines))
    .bind(&req.idempotency_key)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let token = issue_token(&state, &headers, &req, &order).await?;

    events::publish(
        state.nats.as_ref(),
        DomainEvent::OrderCreated {
            order_id: order.id,
            merchant_oid: order.merchant_oid.clone(),
            total: order.total,
        },
    )
    .await;
    state.mailer.order_confirmation(&req.email, &order);

    Ok(Json(respond(&order, token)))
}

fn respond(order: &Order, iframe_token: String) -> Value {
    json!({
        "status": "success",
        "iframe_token": iframe_token,
        "order_id": order.id,
        "merchant_oid": order.merchant_oid,
    })
}

async fn issue_token(
    state: &AppState,
    headers: &HeaderMap,
    req: &CheckoutRequest,
    order: &Order,
) -> Result<String> {
    let gateway = state
        .config
        .paytr
        .as_ref()
        .ok_or(AppError::PaymentMisconfigured)?;
    let basket = basket_descriptor(&order.items.0);
    let site_url = &state.config.site_url;

    let token_request = TokenRequest {
        user_ip: client_ip(headers),
        merchant_oid: order.merchant_oid.clone(),
        email: req.email.clone(),
        payment_amount: pricing::to_minor_units(order.total),
        user_basket: paytr::encode_basket(&basket),
        no_installment: NO_INSTALLMENT,
        max_installment: MAX_INSTALLMENT,
        currency: CURRENCY.to_string(),
        user_name: order.shipping_address.0.name.clone(),
        user_address: format!(
            "{}, {}/{}",
            order.shipping_address.0.address,
            order.shipping_address.0.district,
            order.shipping_address.0.city
        ),
        user_phone: req.phone.clone(),
        ok_url: format!("{site_url}/checkout/success"),
        fail_url: format!("{site_url}/checkout/failure"),
    };

    let token = paytr::request_iframe_token(&state.http, gateway, &token_request).await?;
    Ok(token)
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Out-of-band payment result from the gateway. Must answer a literal `OK`
/// once the report is accepted, or the gateway keeps retrying.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub merchant_oid: String,
    pub status: String,
    pub total_amount: String,
    pub hash: String,
}

pub async fn payment_callback(
    State(state): State<AppState>,
    Form(callback): Form<PaymentCallback>,
) -> Result<&'static str> {
    let gateway = state
        .config
        .paytr
        .as_ref()
        .ok_or(AppError::PaymentMisconfigured)?;

    if !paytr::verify_callback(
        gateway,
        &callback.merchant_oid,
        &callback.status,
        &callback.total_amount,
        &callback.hash,
    ) {
        return Err(AppError::Validation("invalid callback signature".into()));
    }

    let mut tx = state.db.begin().await?;
    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE merchant_oid = $1 FOR UPDATE",
    )
    .bind(&callback.merchant_oid)
    .fetch_optional(&mut *tx)
    .await?;

    // Unknown or already-settled orders still get an OK; the report was
    // heard, there is just nothing left to do with it.
    let Some(order) = order else {
        return Ok("OK");
    };
    if order.status != OrderStatus::PendingPayment {
        return Ok("OK");
    }

    let event = if callback.status == "success" {
        OrderEvent::StartProcessing
    } else {
        OrderEvent::Cancel
    };
    let transition = order::apply(order.status, event).map_err(AppError::from)?;

    sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(order.id)
        .bind(transition.next)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    events::publish(
        state.nats.as_ref(),
        DomainEvent::OrderStatusChanged {
            order_id: order.id,
            from: order.status,
            to: transition.next,
        },
    )
    .await;

    Ok("OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_fallback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
