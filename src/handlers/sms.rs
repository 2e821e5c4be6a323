//! SMS relay for order and shipping notifications.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::sms::SmsError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendSmsRequest {
    #[validate(length(min = 5, message = "a phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "message cannot be empty"))]
    pub message: String,
}

pub async fn send(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Json(req): Json<SendSmsRequest>,
) -> Result<Json<Value>> {
    req.validate()?;

    state
        .sms
        .send(&req.phone, &req.message)
        .await
        .map_err(|e| match e {
            SmsError::Http(e) => AppError::Upstream(e),
            SmsError::NotConfigured | SmsError::Provider(_) => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({"success": true})))
}
