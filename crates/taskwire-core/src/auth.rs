//! Personal API tokens: issued from chat, stored hashed, exchanged by the CLI
//! for an owner identifier.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{BackendError, TokenBackend};

pub const TOKEN_TTL_DAYS: i64 = 90;
pub const DEFAULT_TOKEN_NAME: &str = "CLI Token";
pub const TOKEN_FILE_NAME: &str = ".todo-cli-token";
pub const TOKEN_ENV_VARS: [&str; 2] = ["TODO_CLI_TOKEN", "TODO_CLI_API_TOKEN"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: i64,
    pub user_id: String,
    #[serde(default)]
    pub token_hash: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|expires| expires < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewApiToken {
    pub user_id: String,
    pub token_hash: String,
    pub name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Unknown,
    #[error("Token expired")]
    Expired,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub fn generate_token() -> String {
    format!("{}-{}", Uuid::new_v4(), Uuid::new_v4())
}

/// Hex-encoded SHA-256; the only form in which tokens are stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create and store a new token. The plain token is returned once and never
/// persisted.
pub async fn issue_token<B: TokenBackend + ?Sized>(
    backend: &B,
    owner: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<(String, ApiToken), BackendError> {
    let token = generate_token();
    let name = if name.trim().is_empty() {
        DEFAULT_TOKEN_NAME
    } else {
        name.trim()
    };
    let record = backend
        .insert_token(&NewApiToken {
            user_id: owner.to_string(),
            token_hash: hash_token(&token),
            name: name.to_string(),
            expires_at: now + Duration::days(TOKEN_TTL_DAYS),
        })
        .await?;
    Ok((token, record))
}

pub async fn verify_token<B: TokenBackend + ?Sized>(
    backend: &B,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ApiToken, TokenError> {
    let record = backend
        .token_by_hash(&hash_token(token.trim()))
        .await?
        .ok_or(TokenError::Unknown)?;
    if record.is_expired(now) {
        return Err(TokenError::Expired);
    }
    Ok(record)
}

/// Token for CLI auth: environment first, then `~/.todo-cli-token`.
pub fn load_cli_token(
    lookup: impl Fn(&str) -> Option<String>,
    home: Option<&Path>,
) -> Option<String> {
    for name in TOKEN_ENV_VARS {
        if let Some(value) = lookup(name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    let path = home?.join(TOKEN_FILE_NAME);
    let text = fs::read_to_string(path).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
