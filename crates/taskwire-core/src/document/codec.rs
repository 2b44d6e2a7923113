use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::task::{Priority, Task, TaskId};

/// One decoded document line. Only `checked` and `id` are guaranteed; the
/// other fields are filled by codecs that carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub checked: bool,
    pub id: TaskId,
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

pub trait LineCodec: Send + Sync {
    fn encode(&self, task: &Task, today: NaiveDate) -> String;

    /// `None` for lines that are not task lines in this encoding.
    fn decode(&self, line: &str) -> Option<DocLine>;

    /// Whether title, priority and due date survive a round trip.
    fn carries_fields(&self) -> bool;
}

fn checkbox(task: &Task) -> &'static str {
    if task.status.is_done() {
        "[x]"
    } else {
        "[ ]"
    }
}

fn is_checked(mark: &str) -> bool {
    mark.eq_ignore_ascii_case("x")
}

/// `- [ ] Buy milk — P1 — id:5 — due:2026-02-02`
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineCodec;

fn inline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*- \[([ xX])\] (.+?) — (P[0-4]) — id:(\d+) — due:(\d{4}-\d{2}-\d{2})\s*$",
        )
        .expect("inline line regex")
    })
}

impl LineCodec for InlineCodec {
    fn encode(&self, task: &Task, _today: NaiveDate) -> String {
        format!(
            "- {} {} — {} — id:{} — due:{}",
            checkbox(task),
            task.title,
            task.priority,
            task.id,
            task.due_date.format("%Y-%m-%d")
        )
    }

    fn decode(&self, line: &str) -> Option<DocLine> {
        let caps = inline_re().captures(line)?;
        let id = caps[4].parse::<TaskId>().ok()?;
        let priority = caps[3].parse::<Priority>().ok()?;
        let due_date = NaiveDate::parse_from_str(&caps[5], "%Y-%m-%d").ok()?;
        Some(DocLine {
            checked: is_checked(&caps[1]),
            id,
            title: Some(caps[2].trim().to_string()),
            priority: Some(priority),
            due_date: Some(due_date),
        })
    }

    fn carries_fields(&self) -> bool {
        true
    }
}

/// `- [ ] [P1] Buy milk — due 2026-02-03 <!-- id:5 -->`, with the due suffix
/// left out for tasks due today. Only the checkbox is read back.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentCodec;

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*- \[([ xX])\] .*<!--\s*id:(\d+)\s*-->\s*$").expect("comment line regex")
    })
}

impl LineCodec for CommentCodec {
    fn encode(&self, task: &Task, today: NaiveDate) -> String {
        let due = if task.due_date == today {
            String::new()
        } else {
            format!(" — due {}", task.due_date.format("%Y-%m-%d"))
        };
        format!(
            "- {} [{}] {}{} <!-- id:{} -->",
            checkbox(task),
            task.priority,
            task.title,
            due,
            task.id
        )
    }

    fn decode(&self, line: &str) -> Option<DocLine> {
        let caps = comment_re().captures(line)?;
        Some(DocLine {
            checked: is_checked(&caps[1]),
            id: caps[2].parse::<TaskId>().ok()?,
            title: None,
            priority: None,
            due_date: None,
        })
    }

    fn carries_fields(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    #[default]
    Inline,
    Comment,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown document format: {0} (expected inline or comment)")]
pub struct UnknownFormat(pub String);

impl DocFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocFormat::Inline => "inline",
            DocFormat::Comment => "comment",
        }
    }

    pub fn codec(self) -> &'static dyn LineCodec {
        static INLINE: InlineCodec = InlineCodec;
        static COMMENT: CommentCodec = CommentCodec;
        match self {
            DocFormat::Inline => &INLINE,
            DocFormat::Comment => &COMMENT,
        }
    }
}

impl fmt::Display for DocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocFormat {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inline" | "a" => Ok(DocFormat::Inline),
            "comment" | "b" => Ok(DocFormat::Comment),
            _ => Err(UnknownFormat(value.to_string())),
        }
    }
}
