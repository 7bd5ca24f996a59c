//! Request handlers for the deduplication API.
//!
//! Inbound `key` parameters arrive URL-encoded and are decoded by the
//! query extractor; outbound keys are URL-encoded again because the
//! base64 padding character is not query-safe. The core only ever sees
//! the raw fingerprint string.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::models::EntryKey;

/// Largest accepted request body in bytes.
pub(crate) const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Query parameters carrying the entry key.
#[derive(Debug, Deserialize)]
pub(crate) struct KeyQuery {
    key: Option<String>,
}

impl KeyQuery {
    /// Extracts the key or rejects the request with a 400.
    fn require(self) -> Result<EntryKey, ApiError> {
        self.key.map(EntryKey::from).ok_or(ApiError::MissingKey)
    }
}

/// `POST /api/add` - records a submission and responds with its key.
pub(crate) async fn add_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_body_size(&body)?;
    let key = state.service().submit(&body)?;
    Ok(Json(serde_json::json!({ "key": wire_key(&key) })))
}

/// `GET /api/get?key=` - responds with the stored body plus a
/// `duplicates` field.
pub(crate) async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = query.require()?;
    let entry = state.service().fetch(&key)?;
    Ok(Json(entry.merged_body()?))
}

/// `DELETE /api/remove?key=` - deletes an entry.
pub(crate) async fn remove_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = query.require()?;
    state.service().remove(&key)?;
    Ok(Json(serde_json::json!({ "key": wire_key(&key) })))
}

/// `PUT /api/update?key=` - rekeys the entry onto the new payload and
/// responds with the new key.
pub(crate) async fn update_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_body_size(&body)?;
    let old_key = query.require()?;
    let new_key = state.service().rekey(&old_key, &body)?;
    Ok(Json(serde_json::json!({ "key": wire_key(&new_key) })))
}

/// `GET /api/statistic` - responds with the duplicate rate.
pub(crate) async fn statistic_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.service().statistics()?;
    Ok(Json(
        serde_json::json!({ "percentage": stats.duplicate_rate() }),
    ))
}

/// `GET /health` - liveness probe.
pub(crate) async fn health_handler() -> &'static str {
    "OK"
}

/// URL-encodes a key for transport.
fn wire_key(key: &EntryKey) -> String {
    urlencoding::encode(key.as_str()).into_owned()
}

fn check_body_size(body: &Bytes) -> Result<(), ApiError> {
    if body.len() > MAX_BODY_SIZE {
        tracing::warn!(
            body_size = body.len(),
            max_size = MAX_BODY_SIZE,
            "request body too large"
        );
        return Err(ApiError::BodyTooLarge(MAX_BODY_SIZE));
    }
    Ok(())
}
