use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use taskwire_core::backend::{Backend, BackendError};
use taskwire_core::input::local_today;
use taskwire_core::report::{daily_digest, weekly_review};

use crate::chat::{ChatError, ChatSender, Update};
use crate::commands::respond;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub chat: Arc<dyn ChatSender>,
    /// Chat that receives the scheduled digests.
    pub digest_owner: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

#[derive(Debug, Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) | ApiError::Chat(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ApiResponse {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .route("/digest/daily", post(digest_daily))
        .route("/digest/weekly", post(digest_weekly))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> Result<&'static str, ApiError> {
    let update: Update = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;
    let Some((chat_id, text)) = update.text_message() else {
        return Ok("OK");
    };
    let chat_id = chat_id.to_string();
    info!(chat_id = %chat_id, "chat command");

    let reply = respond(
        state.backend.as_ref(),
        &chat_id,
        text,
        local_today(),
        Utc::now(),
    )
    .await;
    // Reply failures are logged only; the update still counts as handled.
    if let Err(err) = state.chat.send(&chat_id, &reply).await {
        warn!(chat_id = %chat_id, error = %err, "failed to send reply");
    }
    Ok("OK")
}

async fn digest_daily(State(state): State<AppState>) -> Result<Json<ApiResponse>, ApiError> {
    let digest = daily_digest(state.backend.as_ref(), &state.digest_owner, local_today()).await?;
    state.chat.send(&state.digest_owner, &digest.render()).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Digest sent".to_string(),
    }))
}

async fn digest_weekly(State(state): State<AppState>) -> Result<Json<ApiResponse>, ApiError> {
    let review = weekly_review(state.backend.as_ref(), &state.digest_owner, local_today()).await?;
    state.chat.send(&state.digest_owner, &review.render()).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: "Weekly report sent".to_string(),
    }))
}
