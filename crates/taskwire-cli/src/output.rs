use std::io::IsTerminal;

use chrono::NaiveDate;

use taskwire_core::agenda::Bucket;
use taskwire_core::task::Task;

pub const LIST_LIMIT: usize = 15;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// ANSI colouring, off when `NO_COLOR` is set or stdout is not a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn colored() -> Self {
        Self { enabled: true }
    }

    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        Self {
            enabled: !no_color && std::io::stdout().is_terminal(),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

pub fn task_line(task: &Task, today: NaiveDate, palette: Palette) -> String {
    let mut line = format!("[id:{}] [{}] {}", task.id, task.priority, task.title);
    match Bucket::classify(task.due_date, today) {
        Bucket::Overdue => {
            line.push_str(&format!(" — due {} ⚠️ overdue", task.due_date));
            palette.paint(RED, &line)
        }
        Bucket::Today => {
            line.push_str(" (today)");
            palette.paint(YELLOW, &line)
        }
        Bucket::Upcoming => {
            line.push_str(&format!(" — due {}", task.due_date));
            line
        }
    }
}

/// Pending list in backend order, capped at [`LIST_LIMIT`] unless `all`.
pub fn task_list(tasks: &[Task], today: NaiveDate, palette: Palette, all: bool) -> String {
    if tasks.is_empty() {
        return "🎉 No pending tasks!\n".to_string();
    }
    let limit = if all { tasks.len() } else { LIST_LIMIT };
    let mut out = String::from("📋 All pending tasks:\n\n");
    for task in tasks.iter().take(limit) {
        out.push_str(&task_line(task, today, palette));
        out.push('\n');
    }
    if tasks.len() > limit {
        out.push_str(&format!("...and {} more\n", tasks.len() - limit));
    }
    out
}
