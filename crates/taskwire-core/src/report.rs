//! Daily digest and weekly review messages.

use std::fmt::Write as _;

use chrono::{Duration, NaiveDate};

use crate::backend::{BackendError, TaskBackend};
use crate::query::{Cmp, Filter, Order, TaskQuery};
use crate::task::{Status, Task};

const SECTION_LIMIT: usize = 10;

fn owned(owner: &str, status: Status) -> TaskQuery {
    TaskQuery::new()
        .filter(Filter::Owner(owner.to_string()))
        .filter(Filter::Status(status))
}

fn push_more(out: &mut String, total: usize) {
    if total > SECTION_LIMIT {
        let _ = writeln!(out, "...and {} more", total - SECTION_LIMIT);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyDigest {
    pub overdue: Vec<Task>,
    pub today: Vec<Task>,
    /// Due after today and no later than two days out.
    pub upcoming: Vec<Task>,
    /// Done tasks created yesterday.
    pub completed_yesterday: Vec<Task>,
}

impl DailyDigest {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty()
            && self.today.is_empty()
            && self.upcoming.is_empty()
            && self.completed_yesterday.is_empty()
    }

    pub fn render(&self) -> String {
        if self.is_empty() {
            return "🎉 No pending tasks! Enjoy your day.".to_string();
        }
        let mut out = String::from("☀️ Good morning! Here's your task overview:\n");

        if !self.overdue.is_empty() {
            let _ = writeln!(out, "\n🔴 OVERDUE ({})", self.overdue.len());
            for task in self.overdue.iter().take(SECTION_LIMIT) {
                let _ = writeln!(
                    out,
                    "• [{}] {} — was due {}",
                    task.priority, task.title, task.due_date
                );
            }
            push_more(&mut out, self.overdue.len());
        }
        if !self.today.is_empty() {
            let _ = writeln!(out, "\n📅 TODAY ({})", self.today.len());
            for task in self.today.iter().take(SECTION_LIMIT) {
                let _ = writeln!(out, "• [{}] {}", task.priority, task.title);
            }
            push_more(&mut out, self.today.len());
        }
        if !self.upcoming.is_empty() {
            let _ = writeln!(out, "\n📆 NEXT 2 DAYS ({})", self.upcoming.len());
            for task in self.upcoming.iter().take(SECTION_LIMIT) {
                let _ = writeln!(
                    out,
                    "• [{}] {} — due {}",
                    task.priority, task.title, task.due_date
                );
            }
            push_more(&mut out, self.upcoming.len());
        }
        if !self.completed_yesterday.is_empty() {
            let _ = writeln!(
                out,
                "\n✅ COMPLETED YESTERDAY ({})",
                self.completed_yesterday.len()
            );
            out.push_str("Great job! You finished:\n");
            for task in self.completed_yesterday.iter().take(SECTION_LIMIT) {
                let _ = writeln!(out, "• {}", task.title);
            }
        }
        out.push_str("\nHave a productive day! 💪");
        out
    }
}

pub async fn daily_digest<B: TaskBackend + ?Sized>(
    backend: &B,
    owner: &str,
    today: NaiveDate,
) -> Result<DailyDigest, BackendError> {
    let yesterday = today - Duration::days(1);
    let day_after = today + Duration::days(2);

    let overdue = backend
        .select(
            &owned(owner, Status::Todo)
                .filter(Filter::DueDate(Cmp::Lt, today))
                .order_by(Order::PriorityAsc)
                .order_by(Order::DueDateAsc),
        )
        .await?;
    let due_today = backend
        .select(
            &owned(owner, Status::Todo)
                .filter(Filter::DueDate(Cmp::Eq, today))
                .order_by(Order::PriorityAsc),
        )
        .await?;
    let upcoming = backend
        .select(
            &owned(owner, Status::Todo)
                .filter(Filter::DueDate(Cmp::Gt, today))
                .filter(Filter::DueDate(Cmp::Lte, day_after))
                .order_by(Order::PriorityAsc)
                .order_by(Order::DueDateAsc),
        )
        .await?;
    let completed_yesterday = backend
        .select(
            &owned(owner, Status::Done)
                .filter(Filter::CreatedAt(Cmp::Gte, yesterday))
                .filter(Filter::CreatedAt(Cmp::Lt, today)),
        )
        .await?;

    Ok(DailyDigest {
        overdue,
        today: due_today,
        upcoming,
        completed_yesterday,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReview {
    pub today: NaiveDate,
    pub completed: Vec<Task>,
    pub pending: Vec<Task>,
    /// Tasks of any status created during the last seven days.
    pub added: usize,
    pub upcoming: Vec<Task>,
}

impl WeeklyReview {
    /// Percentage of done tasks among done plus pending, rounded.
    pub fn completion_rate(&self) -> u32 {
        let total = self.completed.len() + self.pending.len();
        if total == 0 {
            return 0;
        }
        ((self.completed.len() as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn render(&self) -> String {
        let week_start = self.today - Duration::days(6);
        let mut out = format!(
            "📊 Weekly Review — Week of {} - {}\n",
            week_start.format("%b %-d"),
            self.today.format("%b %-d")
        );

        if !self.completed.is_empty() {
            let _ = writeln!(out, "\n✅ COMPLETED THIS WEEK ({})", self.completed.len());
            for task in self.completed.iter().take(SECTION_LIMIT) {
                let _ = writeln!(out, "• {}", task.title);
            }
            push_more(&mut out, self.completed.len());
        }
        if !self.pending.is_empty() {
            let _ = writeln!(out, "\n📋 STILL PENDING ({})", self.pending.len());
            for task in self.pending.iter().take(SECTION_LIMIT) {
                let due = if task.due_date < self.today {
                    format!("was due {}", task.due_date)
                } else {
                    format!("due {}", task.due_date)
                };
                let _ = writeln!(out, "• [{}] {} — {}", task.priority, task.title, due);
            }
            push_more(&mut out, self.pending.len());
        }

        out.push_str("\n📈 STATS\n");
        let _ = writeln!(out, "• Completion rate: {}%", self.completion_rate());
        let _ = writeln!(out, "• Tasks completed: {}", self.completed.len());
        let _ = writeln!(out, "• Tasks added: {}", self.added);

        if !self.upcoming.is_empty() {
            let _ = writeln!(out, "\n🎯 UPCOMING NEXT WEEK ({})", self.upcoming.len());
            for task in self.upcoming.iter().take(SECTION_LIMIT) {
                let _ = writeln!(
                    out,
                    "• [{}] {} — due {}",
                    task.priority, task.title, task.due_date
                );
            }
            push_more(&mut out, self.upcoming.len());
        }

        out.push_str("\nHave a great week ahead! 🚀");
        out
    }
}

pub async fn weekly_review<B: TaskBackend + ?Sized>(
    backend: &B,
    owner: &str,
    today: NaiveDate,
) -> Result<WeeklyReview, BackendError> {
    let week_ago = today - Duration::days(7);
    let week_ahead = today + Duration::days(7);

    let completed = backend
        .select(
            &owned(owner, Status::Done)
                .filter(Filter::CreatedAt(Cmp::Gte, week_ago))
                .order_by(Order::CreatedAtDesc),
        )
        .await?;
    let pending = backend.pending(owner).await?;
    let added = backend
        .select(
            &TaskQuery::new()
                .filter(Filter::Owner(owner.to_string()))
                .filter(Filter::CreatedAt(Cmp::Gte, week_ago)),
        )
        .await?
        .len();
    let upcoming = backend
        .select(
            &owned(owner, Status::Todo)
                .filter(Filter::DueDate(Cmp::Gt, today))
                .filter(Filter::DueDate(Cmp::Lte, week_ahead))
                .order_by(Order::DueDateAsc)
                .order_by(Order::PriorityAsc),
        )
        .await?;

    Ok(WeeklyReview {
        today,
        completed,
        pending,
        added,
        upcoming,
    })
}
