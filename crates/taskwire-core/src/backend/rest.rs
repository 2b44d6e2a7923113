use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{BackendError, TaskBackend, TokenBackend};
use crate::auth::{ApiToken, NewApiToken};
use crate::config::BackendConfig;
use crate::query::TaskQuery;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

const TASKS_TABLE: &str = "tasks";
const TOKENS_TABLE: &str = "api_tokens";
const RETURN_ROWS: (&str, &str) = ("Prefer", "return=representation");

/// PostgREST client authenticated with a single service key.
#[derive(Debug, Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    key: String,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("taskwire/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, BackendError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|err| BackendError::Decode(err.to_string()))
    }
}

fn owner_scope(id: TaskId, owner: Option<&str>) -> Vec<(String, String)> {
    TaskQuery::by_id(id, owner).to_query_pairs()
}

#[async_trait]
impl TaskBackend for RestBackend {
    async fn select(&self, query: &TaskQuery) -> Result<Vec<Task>, BackendError> {
        let pairs = query.to_query_pairs();
        debug!(?pairs, "select tasks");
        let response = self
            .request(Method::GET, TASKS_TABLE)
            .query(&pairs)
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn create(&self, task: &NewTask) -> Result<Task, BackendError> {
        let response = self
            .request(Method::POST, TASKS_TABLE)
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .json(task)
            .send()
            .await?;
        Self::rows::<Task>(response)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::Empty)
    }

    async fn update(
        &self,
        id: TaskId,
        owner: Option<&str>,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, BackendError> {
        debug!(id, fields = ?patch.changed_fields(), "update task");
        let response = self
            .request(Method::PATCH, TASKS_TABLE)
            .query(&owner_scope(id, owner))
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .json(patch)
            .send()
            .await?;
        Ok(Self::rows::<Task>(response).await?.into_iter().next())
    }
}

#[async_trait]
impl TokenBackend for RestBackend {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, BackendError> {
        let response = self
            .request(Method::POST, TOKENS_TABLE)
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .json(token)
            .send()
            .await?;
        Self::rows::<ApiToken>(response)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::Empty)
    }

    async fn tokens_for(&self, owner: &str) -> Result<Vec<ApiToken>, BackendError> {
        let response = self
            .request(Method::GET, TOKENS_TABLE)
            .query(&[
                ("user_id", format!("eq.{owner}")),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn token_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, BackendError> {
        let response = self
            .request(Method::GET, TOKENS_TABLE)
            .query(&[("token_hash", format!("eq.{token_hash}"))])
            .send()
            .await?;
        Ok(Self::rows::<ApiToken>(response).await?.into_iter().next())
    }

    async fn delete_token(&self, id: i64, owner: &str) -> Result<Option<ApiToken>, BackendError> {
        let response = self
            .request(Method::DELETE, TOKENS_TABLE)
            .query(&[
                ("id", format!("eq.{id}")),
                ("user_id", format!("eq.{owner}")),
            ])
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .send()
            .await?;
        Ok(Self::rows::<ApiToken>(response).await?.into_iter().next())
    }
}
