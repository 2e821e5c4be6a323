//! maison-commerce — storefront and back-office service for a home-goods
//! retailer.
//!
//! The interesting parts are the checkout pipeline (server-side cart
//! re-pricing, payment-gateway token signing) and the support-ticket thread
//! with live delivery; everything else is catalog and back-office CRUD.

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod paytr;
pub mod realtime;
pub mod sms;
pub mod storage;

use config::Config;
use handlers::{
    categories, checkout, orders, products, returns, settings, sms as sms_api, support, uploads,
};
use notify::Mailer;
use realtime::TicketFeed;
use sms::SmsService;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
    pub feed: TicketFeed,
    pub mailer: Mailer,
    pub sms: SmsService,
    pub storage: Option<Storage>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "maison-commerce"}))
            }),
        )
        // storefront
        .route("/api/products", get(products::list))
        .route("/api/products/:id", get(products::get))
        .route("/api/products/slug/:slug", get(products::get_by_slug))
        .route("/api/categories", get(categories::list))
        .route("/api/categories/:id", get(categories::get))
        .route("/api/settings", get(settings::list))
        .route("/api/checkout", post(checkout::checkout))
        .route("/api/payment/callback", post(checkout::payment_callback))
        // customer account
        .route("/api/orders", get(orders::list_own))
        .route("/api/orders/:id", get(orders::get))
        .route("/api/returns", get(returns::list_own).post(returns::create))
        .route("/api/support/tickets", get(support::list).post(support::create))
        .route("/api/support/tickets/:id", get(support::get))
        .route("/api/support/tickets/:id/reply", post(support::reply))
        .route("/api/support/tickets/:id/status", patch(support::update_status))
        .route("/api/support/tickets/:id/stream", get(support::stream))
        .route("/api/sms/send", post(sms_api::send))
        // back office
        .route("/api/admin/products", post(products::create))
        .route(
            "/api/admin/products/:id",
            put(products::update).delete(products::delete),
        )
        .route("/api/admin/categories", post(categories::create))
        .route(
            "/api/admin/categories/:id",
            put(categories::update).delete(categories::delete),
        )
        .route("/api/admin/orders", get(orders::admin_list))
        .route("/api/admin/orders/:id/status", patch(orders::update_status))
        .route("/api/admin/returns", get(returns::admin_list))
        .route("/api/admin/returns/:id", patch(returns::decide))
        .route("/api/admin/uploads", post(uploads::upload))
        .route("/api/admin/settings/:key", put(settings::put))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
