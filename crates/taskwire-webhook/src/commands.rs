//! Chat command vocabulary and the reply text for each command.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use taskwire_core::agenda::{Agenda, Bucket};
use taskwire_core::auth::{issue_token, TOKEN_FILE_NAME};
use taskwire_core::backend::Backend;
use taskwire_core::input::{parse_task_id, InputError};
use taskwire_core::service::{ServiceError, TaskService};

const LIST_SECTION_LIMIT: usize = 10;

pub const WELCOME: &str = "👋 Welcome to TODO Tracker!\n\n\
Commands:\n\
add <task> - Add task\n\
list, ls - Show tasks\n\
done, rm <id> - Complete task\n\
snooze <id> - Postpone to tomorrow\n\
subtask <id> <task> - Add subtask\n\
token [name] - Generate API token for CLI\n\
revoke [id] - List or revoke API tokens\n\n\
(Slash prefix is optional)";

pub const UNKNOWN: &str =
    "❌ Unknown command. Use add, list (ls), done (rm), snooze, subtask, token, or revoke";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Add(String),
    List,
    Done(String),
    Snooze(String),
    Subtask(String),
    Token(String),
    Revoke(String),
    Start,
    Unknown,
}

impl ChatCommand {
    /// The leading slash is optional. A `@botname` suffix on the command
    /// word is dropped.
    pub fn parse(text: &str) -> ChatCommand {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim().to_string()),
            None => (text, String::new()),
        };
        let word = head.strip_prefix('/').unwrap_or(head);
        let word = word.split('@').next().unwrap_or(word).to_ascii_lowercase();
        match word.as_str() {
            "add" => ChatCommand::Add(rest),
            "list" | "ls" => ChatCommand::List,
            "done" | "rm" => ChatCommand::Done(rest),
            "snooze" => ChatCommand::Snooze(rest),
            "subtask" => ChatCommand::Subtask(rest),
            "token" => ChatCommand::Token(rest),
            "revoke" => ChatCommand::Revoke(rest),
            "start" | "help" => ChatCommand::Start,
            _ => ChatCommand::Unknown,
        }
    }
}

/// Run one chat command for `chat_id` and build the reply. Failures become
/// reply text; nothing is retried.
pub async fn respond(
    backend: &dyn Backend,
    chat_id: &str,
    text: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> String {
    let service = TaskService::new(backend, today);
    match ChatCommand::parse(text) {
        ChatCommand::Add(rest) => add(&service, chat_id, &rest).await,
        ChatCommand::List => list(&service, chat_id).await,
        ChatCommand::Done(rest) => done(&service, chat_id, &rest).await,
        ChatCommand::Snooze(rest) => snooze(&service, chat_id, &rest).await,
        ChatCommand::Subtask(rest) => subtask(&service, chat_id, &rest).await,
        ChatCommand::Token(rest) => token(backend, chat_id, &rest, now).await,
        ChatCommand::Revoke(rest) => revoke(backend, chat_id, &rest).await,
        ChatCommand::Start => WELCOME.to_string(),
        ChatCommand::Unknown => UNKNOWN.to_string(),
    }
}

type Service<'a> = TaskService<'a, dyn Backend + 'a>;

async fn add(service: &Service<'_>, chat_id: &str, text: &str) -> String {
    match service.add(chat_id, text).await {
        Ok(task) => format!(
            "✅ Task added: {} — due {} [{}]",
            task.title, task.due_date, task.priority
        ),
        Err(ServiceError::Input(InputError::MissingTitle)) => {
            "❌ Missing task title. Usage: /add <task>".to_string()
        }
        Err(ServiceError::Input(err)) => format!("❌ {err}"),
        Err(err) => {
            warn!(chat_id, error = %err, "add failed");
            format!("❌ Failed to add task: {err}")
        }
    }
}

async fn list(service: &Service<'_>, chat_id: &str) -> String {
    let tasks = match service.pending(chat_id).await {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(chat_id, error = %err, "list failed");
            return format!("❌ Failed to fetch tasks: {err}");
        }
    };
    let agenda = Agenda::partition(&tasks, service.today());
    if agenda.is_empty() {
        return "🎉 No pending tasks!".to_string();
    }

    let mut out = String::from("📋 Your tasks:\n");
    for (bucket, section) in agenda.sections() {
        let icon = match bucket {
            Bucket::Overdue => "🔴",
            Bucket::Today => "📅",
            Bucket::Upcoming => "📆",
        };
        let _ = writeln!(out, "\n{icon} {} ({})", bucket.heading(), section.len());
        for task in section.iter().take(LIST_SECTION_LIMIT) {
            let due = match bucket {
                Bucket::Overdue => format!(" — was due {}", task.due_date),
                Bucket::Today => String::new(),
                Bucket::Upcoming => format!(" — due {}", task.due_date),
            };
            let _ = writeln!(out, "[id:{}] [{}] {}{}", task.id, task.priority, task.title, due);
        }
        if section.len() > LIST_SECTION_LIMIT {
            let _ = writeln!(out, "...and {} more", section.len() - LIST_SECTION_LIMIT);
        }
    }
    out
}

async fn done(service: &Service<'_>, chat_id: &str, rest: &str) -> String {
    let Ok(id) = parse_task_id(rest) else {
        return "❌ Invalid task ID. Usage: /done <id>".to_string();
    };
    match service.complete(chat_id, id).await {
        Ok(task) => format!("✅ Marked as done: {}", task.title),
        Err(ServiceError::NotFound(_)) => "❌ Task not found".to_string(),
        Err(err) => {
            warn!(chat_id, id, error = %err, "done failed");
            "❌ Failed to update task".to_string()
        }
    }
}

async fn snooze(service: &Service<'_>, chat_id: &str, rest: &str) -> String {
    let Ok(id) = parse_task_id(rest) else {
        return "❌ Invalid task ID. Usage: /snooze <id>".to_string();
    };
    match service.snooze(chat_id, id).await {
        Ok(task) => format!("✅ Snoozed: {} — now due {}", task.title, task.due_date),
        Err(ServiceError::NotFound(_)) => "❌ Task not found".to_string(),
        Err(err) => {
            warn!(chat_id, id, error = %err, "snooze failed");
            "❌ Failed to snooze task".to_string()
        }
    }
}

async fn subtask(service: &Service<'_>, chat_id: &str, rest: &str) -> String {
    let Some((parent, text)) = rest.split_once(char::is_whitespace) else {
        return "❌ Usage: /subtask <parent_id> <task title>".to_string();
    };
    let Ok(parent_id) = parse_task_id(parent) else {
        return "❌ Invalid parent ID".to_string();
    };
    match service.add_subtask(chat_id, parent_id, text).await {
        Ok((parent, child)) => format!("✅ Subtask added to '{}': {}", parent.title, child.title),
        Err(ServiceError::NotFound(_)) => "❌ Parent task not found".to_string(),
        Err(ServiceError::Input(err)) => format!("❌ {err}"),
        Err(err) => {
            warn!(chat_id, parent_id, error = %err, "subtask failed");
            "❌ Failed to add subtask".to_string()
        }
    }
}

async fn token(backend: &dyn Backend, chat_id: &str, name: &str, now: DateTime<Utc>) -> String {
    match issue_token(backend, chat_id, name, now).await {
        Ok((token, record)) => format!(
            "🔑 API Token created: {}\n\n\
Token: {token}\n\n\
⚠️ Save this token now! It won't be shown again.\n\n\
Use in CLI: Add to ~/{TOKEN_FILE_NAME} or set TODO_CLI_TOKEN env var.",
            record.name
        ),
        Err(err) => {
            warn!(chat_id, error = %err, "token creation failed");
            format!("❌ Failed to create token: {err}")
        }
    }
}

async fn revoke(backend: &dyn Backend, chat_id: &str, rest: &str) -> String {
    if rest.is_empty() {
        let tokens = match backend.tokens_for(chat_id).await {
            Ok(tokens) => tokens,
            Err(err) => return format!("❌ Failed to fetch tokens: {err}"),
        };
        if tokens.is_empty() {
            return "No API tokens found. Use /token to create one.".to_string();
        }
        let day = |at: Option<DateTime<Utc>>| {
            at.map(|at| at.date_naive().to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        let mut out = String::from("🔑 Your API tokens:\n\n");
        for token in &tokens {
            let _ = writeln!(
                out,
                "[id:{}] {}\n  Created: {}, Expires: {}\n",
                token.id,
                token.name,
                day(token.created_at),
                day(token.expires_at)
            );
        }
        out.push_str("To revoke: /revoke <id>");
        return out;
    }

    let Ok(id) = rest.trim().parse::<i64>() else {
        return "❌ Invalid token ID. Usage: /revoke <id>".to_string();
    };
    match backend.delete_token(id, chat_id).await {
        Ok(Some(token)) => format!("✅ Token revoked: {}", token.name),
        Ok(None) => "❌ Token not found".to_string(),
        Err(err) => {
            warn!(chat_id, id, error = %err, "token revoke failed");
            "❌ Failed to revoke token".to_string()
        }
    }
}
