use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    app::internal,
    auth::extractors::AuthUser,
    pantry::repo_types::PantryItem,
    state::AppState,
};

use super::services::{
    ext_from_mime, ingest_receipt, store_receipt_image, UploadItem, RECEIPT_URL_TTL_SECS,
};

pub const RECEIPT_READ_FAILED: &str = "Failed to read receipt.";

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub added: usize,
    pub items: Vec<PantryItem>,
    pub receipt_key: String,
    pub receipt_url: Option<String>,
}

pub fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route("/receipts", post(scan_receipt))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /receipts (multipart)
/// Field: file (jpeg or png)
#[instrument(skip(state, mp))]
pub async fn scan_receipt(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ScanResponse>), (StatusCode, String)> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some((body, content_type));
        break;
    }

    let Some((body, content_type)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "file is required".into()));
    };
    if ext_from_mime(&content_type).is_none() {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "receipt must be a JPEG or PNG image".into(),
        ));
    }
    let upload = UploadItem {
        body,
        content_type: &content_type,
    };

    let receipt_key = store_receipt_image(&state, &username, &upload)
        .await
        .map_err(internal)?;

    let store = state.pantries.open(&username).await.map_err(internal)?;
    let Some(items) = ingest_receipt(state.scanner.as_ref(), &store, &upload)
        .await
        .map_err(internal)?
    else {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, RECEIPT_READ_FAILED.into()));
    };

    let receipt_url = match state.storage.presign_get(&receipt_key, RECEIPT_URL_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %receipt_key, "presign receipt failed");
            None
        }
    };

    info!(%username, added = items.len(), %receipt_key, "receipt scanned");
    Ok((
        StatusCode::CREATED,
        Json(ScanResponse {
            added: items.len(),
            items,
            receipt_key,
            receipt_url,
        }),
    ))
}
