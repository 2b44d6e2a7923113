use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TaskId = i64;

/// Ordinal urgency, `P0` first.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    P0,
    #[default]
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::P0,
        Priority::P1,
        Priority::P2,
        Priority::P3,
        Priority::P4,
    ];

    pub fn from_level(level: u8) -> Option<Priority> {
        Self::ALL.get(usize::from(level)).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let level = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .and_then(|digits| digits.parse::<u8>().ok());
        level
            .and_then(Priority::from_level)
            .ok_or_else(|| UnknownPriority(value.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Todo,
    Done,
}

impl Status {
    pub fn from_checked(checked: bool) -> Status {
        if checked {
            Status::Done
        } else {
            Status::Todo
        }
    }

    pub fn is_done(self) -> bool {
        self == Status::Done
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "Todo",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub user_id: String,
}

/// Partial update. Only populated fields are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn due_date(due_date: NaiveDate) -> Self {
        Self {
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.title.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.title.is_some() {
            fields.push("title");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        if self.due_date.is_some() {
            fields.push("due_date");
        }
        fields
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}
