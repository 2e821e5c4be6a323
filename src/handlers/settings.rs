//! Site-wide key/value settings (banner text, contact details, …).

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{Map, Value};
use sqlx::types::Json as Jsonb;

use crate::auth::AdminUser;
use crate::error::Result;
use crate::models::SiteSetting;
use crate::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>> {
    let settings = sqlx::query_as::<_, SiteSetting>("SELECT * FROM site_settings")
        .fetch_all(&state.db)
        .await?;

    let map: Map<String, Value> = settings
        .into_iter()
        .map(|s| (s.key, s.value.0))
        .collect();
    Ok(Json(Value::Object(map)))
}

pub async fn put(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<SiteSetting>> {
    let setting = sqlx::query_as::<_, SiteSetting>(
        "INSERT INTO site_settings (key, value, updated_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
         RETURNING *",
    )
    .bind(&key)
    .bind(Jsonb(&value))
    .fetch_one(&state.db)
    .await?;
    Ok(Json(setting))
}
