use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use taskwire_core::auth::{load_cli_token, verify_token};
use taskwire_core::backend::Backend;
use taskwire_core::config::{env_var, resolve_user_home_dir, Settings};
use taskwire_core::input::{parse_task_id, InputError};
use taskwire_core::report::{daily_digest, weekly_review};
use taskwire_core::service::{ServiceError, TaskService};
use taskwire_core::task::TaskId;

use crate::output::{task_list, Palette};

/// A validated command, ready to run against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add(String),
    List { all: bool },
    Done(TaskId),
    Snooze(TaskId),
    Subtask { parent: TaskId, text: String },
    Digest { weekly: bool },
}

impl Action {
    pub fn add(words: &[String]) -> Result<Action> {
        let text = words.join(" ");
        if text.trim().is_empty() {
            bail!("Missing task title. Usage: todo add <task>");
        }
        Ok(Action::Add(text))
    }

    pub fn done(id: &str) -> Result<Action, InputError> {
        Ok(Action::Done(parse_task_id(id)?))
    }

    pub fn snooze(id: &str) -> Result<Action, InputError> {
        Ok(Action::Snooze(parse_task_id(id)?))
    }

    pub fn subtask(parent: &str, words: &[String]) -> Result<Action> {
        let parent = parse_task_id(parent)?;
        let text = words.join(" ");
        if text.trim().is_empty() {
            bail!("Usage: todo subtask <parent_id> <task>");
        }
        Ok(Action::Subtask { parent, text })
    }
}

/// Owner the CLI acts for: the token's owner when a token is configured,
/// otherwise the configured owner.
pub async fn resolve_owner(
    backend: &dyn Backend,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<String> {
    let home = resolve_user_home_dir();
    let token = load_cli_token(env_var, home.as_deref());
    owner_for(backend, token.as_deref(), &settings.owner, now).await
}

async fn owner_for(
    backend: &dyn Backend,
    token: Option<&str>,
    fallback: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let Some(token) = token else {
        return Ok(fallback.to_string());
    };
    let record = verify_token(backend, token, now)
        .await
        .map_err(|err| anyhow::anyhow!("Invalid API token: {err}"))?;
    debug!(owner = %record.user_id, "authenticated with API token");
    Ok(record.user_id)
}

pub async fn execute(
    backend: &dyn Backend,
    owner: &str,
    action: Action,
    today: NaiveDate,
    palette: Palette,
) -> Result<String> {
    let service = TaskService::new(backend, today);
    let output = match action {
        Action::Add(text) => {
            let task = service.add(owner, &text).await?;
            format!(
                "✅ Task added: {} — due {} [{}]\n",
                task.title, task.due_date, task.priority
            )
        }
        Action::List { all } => {
            let tasks = service.pending(owner).await?;
            task_list(&tasks, today, palette, all)
        }
        Action::Done(id) => {
            let task = service.complete(owner, id).await.map_err(not_found)?;
            format!("✅ Marked as done: {}\n", task.title)
        }
        Action::Snooze(id) => {
            let task = service.snooze(owner, id).await.map_err(not_found)?;
            format!("✅ Snoozed: {} — now due {}\n", task.title, task.due_date)
        }
        Action::Subtask { parent, text } => {
            let (parent, child) = service
                .add_subtask(owner, parent, &text)
                .await
                .map_err(|err| match err {
                    ServiceError::NotFound(_) => anyhow::anyhow!("Parent task not found"),
                    other => other.into(),
                })?;
            format!("✅ Subtask added: {} (under #{})\n", child.title, parent.id)
        }
        Action::Digest { weekly: false } => {
            let mut text = daily_digest(backend, owner, today).await?.render();
            text.push('\n');
            text
        }
        Action::Digest { weekly: true } => {
            let mut text = weekly_review(backend, owner, today).await?.render();
            text.push('\n');
            text
        }
    };
    Ok(output)
}

fn not_found(err: ServiceError) -> anyhow::Error {
    match err {
        ServiceError::NotFound(_) => anyhow::anyhow!("Task not found"),
        other => other.into(),
    }
}
