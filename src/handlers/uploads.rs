//! Multi-file image upload to object storage. Files go up concurrently and
//! the whole batch is bounded by a single timeout.

use std::time::Duration;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{AppError, Result};
use crate::AppState;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const ALLOWED_FOLDERS: &[&str] = &["products", "categories"];

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub folder: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| AppError::Internal("object storage not configured".into()))?;

    let folder = params.folder.as_deref().unwrap_or("products");
    if !ALLOWED_FOLDERS.contains(&folder) {
        return Err(AppError::Validation(format!("unknown upload folder {folder:?}")));
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        let key = format!("{folder}/{}.{ext}", Uuid::new_v4());
        files.push((key, content_type, data.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::Validation("no files in upload".into()));
    }

    let uploads = files
        .into_iter()
        .map(|(key, content_type, data)| storage.put_image(key, content_type, data));

    let urls = tokio::time::timeout(UPLOAD_TIMEOUT, futures::future::try_join_all(uploads))
        .await
        .map_err(|_| AppError::Internal("upload timed out".into()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "urls": urls })))
}
