use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use thiserror::Error;

use crate::task::{Priority, TaskId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing task title")]
    MissingTitle,
    #[error("Invalid task ID: {0}")]
    InvalidId(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Free text split into title, optional `[P#]` tag and optional date token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn priority_or(&self, fallback: Priority) -> Priority {
        self.priority.unwrap_or(fallback)
    }

    pub fn due_date_or(&self, fallback: NaiveDate) -> NaiveDate {
        self.due_date.unwrap_or(fallback)
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn tomorrow(today: NaiveDate) -> NaiveDate {
    today.succ_opt().unwrap_or(today)
}

fn priority_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[P([0-4])\]").expect("regex"))
}

fn iso_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("regex"))
}

/// Parse task text such as `[P2] Ship release 2026-03-01`.
///
/// The first `[P0]`..`[P4]` tag sets the priority and every tag is removed
/// from the title. The last word is read as a date (`today`, `tomorrow` or
/// `YYYY-MM-DD`) only when at least one other word remains for the title.
pub fn parse_task_input(text: &str, today: NaiveDate) -> Result<TaskDraft, InputError> {
    let priority = priority_tag()
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|level| level.as_str().parse::<u8>().ok())
        .and_then(Priority::from_level);
    let stripped = priority_tag().replace_all(text, " ");

    let mut words: Vec<&str> = stripped.split_whitespace().collect();
    let mut due_date = None;
    if words.len() > 1 {
        if let Some(last) = words.last().copied() {
            let parsed = match last {
                "today" => Some(today),
                "tomorrow" => Some(tomorrow(today)),
                word if iso_date().is_match(word) => Some(
                    NaiveDate::parse_from_str(word, "%Y-%m-%d")
                        .map_err(|_| InputError::InvalidDate(word.to_string()))?,
                ),
                _ => None,
            };
            if parsed.is_some() {
                due_date = parsed;
                words.pop();
            }
        }
    }

    let title = words.join(" ");
    if title.is_empty() {
        return Err(InputError::MissingTitle);
    }
    Ok(TaskDraft {
        title,
        priority,
        due_date,
    })
}

pub fn parse_task_id(text: &str) -> Result<TaskId, InputError> {
    let trimmed = text.trim();
    match trimmed.parse::<TaskId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(InputError::InvalidId(trimmed.to_string())),
    }
}
