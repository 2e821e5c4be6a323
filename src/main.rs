//! maison-commerce service entry point.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maison_commerce::config::Config;
use maison_commerce::notify::Mailer;
use maison_commerce::realtime::TicketFeed;
use maison_commerce::sms::SmsService;
use maison_commerce::storage::Storage;
use maison_commerce::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, event publishing disabled");
                None
            }
        },
        None => None,
    };

    let http = reqwest::Client::new();
    let storage = match &config.storage {
        Some(storage_config) => Some(Storage::connect(storage_config).await),
        None => None,
    };
    let mailer = Mailer::new(http.clone(), config.email.clone(), config.site_url.clone());
    let sms = SmsService::from_config(http.clone(), &config);

    let port = config.port;
    let state = AppState {
        db,
        nats,
        http,
        config: Arc::new(config),
        feed: TicketFeed::new(),
        mailer,
        sms,
        storage,
    };

    let app = app(state);
    tracing::info!("maison-commerce listening on 0.0.0.0:{port}");
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?,
        app,
    )
    .await?;
    Ok(())
}
