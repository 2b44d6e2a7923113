//! Access to the hosted task tables.

pub mod rest;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{ApiToken, NewApiToken};
use crate::query::TaskQuery;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

pub use rest::RestBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("backend returned no row")]
    Empty,
}

#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn select(&self, query: &TaskQuery) -> Result<Vec<Task>, BackendError>;

    async fn create(&self, task: &NewTask) -> Result<Task, BackendError>;

    /// Apply `patch` to the row with `id` (and `owner`, when given). Returns
    /// the updated row, or `None` when nothing matched.
    async fn update(
        &self,
        id: TaskId,
        owner: Option<&str>,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, BackendError>;

    async fn get(&self, id: TaskId, owner: Option<&str>) -> Result<Option<Task>, BackendError> {
        let tasks = self.select(&TaskQuery::by_id(id, owner)).await?;
        Ok(tasks.into_iter().next())
    }

    async fn pending(&self, owner: &str) -> Result<Vec<Task>, BackendError> {
        self.select(&TaskQuery::pending_for(owner)).await
    }
}

#[async_trait]
pub trait TokenBackend: Send + Sync {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, BackendError>;

    /// Tokens of one owner, newest first.
    async fn tokens_for(&self, owner: &str) -> Result<Vec<ApiToken>, BackendError>;

    async fn token_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, BackendError>;

    async fn delete_token(&self, id: i64, owner: &str) -> Result<Option<ApiToken>, BackendError>;
}

/// Everything the chat front end needs from one backend handle.
pub trait Backend: TaskBackend + TokenBackend {}

impl<T: TaskBackend + TokenBackend> Backend for T {}
