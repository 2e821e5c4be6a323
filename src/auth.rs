//! Per-request authorization context.
//!
//! Session management lives with the delegated auth provider; this module
//! only verifies its bearer tokens and resolves the server-assigned role.
//! Handlers receive an explicit [`AuthContext`] through the extractors
//! below, so authorization checks stay testable without a request in hand.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Role;
use crate::AppState;

#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Any authenticated caller.
pub struct AuthUser(pub AuthContext);

/// Authenticated caller with the admin role; the single admin gate for
/// every back-office route.
pub struct AdminUser(pub AuthContext);

/// Caller identity when present; guest checkout proceeds without one.
pub struct OptionalUser(pub Option<AuthContext>);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[allow(dead_code)]
    exp: usize,
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<AuthContext, AppError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let key = DecodingKey::from_secret(state.config.auth_jwt_secret.as_bytes());
    let claims = decode::<Claims>(token, &key, &Validation::default())
        .map_err(|_| AppError::Unauthorized)?
        .claims;

    // Role comes from the profile row, never from the token or the client.
    let role = sqlx::query_scalar::<_, Role>("SELECT role FROM profiles WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&state.db)
        .await?
        .unwrap_or(Role::Customer);

    Ok(AuthContext {
        user_id: claims.sub,
        role,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        resolve(parts, state).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let ctx = resolve(parts, state).await?;
        if !ctx.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(ctx))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalUser(None));
        }
        resolve(parts, state).await.map(|ctx| OptionalUser(Some(ctx)))
    }
}
