//! Filters and ordering for task selects, rendered as PostgREST query pairs
//! (`field=op.value`, `order=field.dir,...`).

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveTime};

use crate::task::{Status, Task, TaskId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Cmp {
    pub fn as_str(self) -> &'static str {
        match self {
            Cmp::Eq => "eq",
            Cmp::Lt => "lt",
            Cmp::Lte => "lte",
            Cmp::Gt => "gt",
            Cmp::Gte => "gte",
        }
    }

    pub fn holds<T: Ord>(self, lhs: &T, rhs: &T) -> bool {
        let ord = lhs.cmp(rhs);
        match self {
            Cmp::Eq => ord == Ordering::Equal,
            Cmp::Lt => ord == Ordering::Less,
            Cmp::Lte => ord != Ordering::Greater,
            Cmp::Gt => ord == Ordering::Greater,
            Cmp::Gte => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Id(TaskId),
    Owner(String),
    Status(Status),
    Parent(TaskId),
    DueDate(Cmp, NaiveDate),
    /// Compared against midnight (UTC) of the given day.
    CreatedAt(Cmp, NaiveDate),
}

impl Filter {
    pub fn to_pair(&self) -> (String, String) {
        let (field, value) = match self {
            Filter::Id(id) => ("id", format!("eq.{id}")),
            Filter::Owner(owner) => ("user_id", format!("eq.{owner}")),
            Filter::Status(status) => ("status", format!("eq.{status}")),
            Filter::Parent(id) => ("parent_id", format!("eq.{id}")),
            Filter::DueDate(cmp, date) => ("due_date", format!("{}.{date}", cmp.as_str())),
            Filter::CreatedAt(cmp, date) => (
                "created_at",
                format!("{}.{}T00:00:00", cmp.as_str(), date),
            ),
        };
        (field.to_string(), value)
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::Id(id) => task.id == *id,
            Filter::Owner(owner) => task.user_id == *owner,
            Filter::Status(status) => task.status == *status,
            Filter::Parent(id) => task.parent_id == Some(*id),
            Filter::DueDate(cmp, date) => cmp.holds(&task.due_date, date),
            Filter::CreatedAt(cmp, date) => {
                let boundary = date.and_time(NaiveTime::MIN);
                task.created_at
                    .map(|created| cmp.holds(&created.naive_utc(), &boundary))
                    .unwrap_or(false)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Order {
    PriorityAsc,
    DueDateAsc,
    CreatedAtDesc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::PriorityAsc => "priority.asc",
            Order::DueDateAsc => "due_date.asc",
            Order::CreatedAtDesc => "created_at.desc",
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Order::PriorityAsc => a.priority.cmp(&b.priority),
            Order::DueDateAsc => a.due_date.cmp(&b.due_date),
            Order::CreatedAtDesc => b.created_at.cmp(&a.created_at),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    filters: Vec<Filter>,
    order: Vec<Order>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Pending tasks of one owner, most urgent first.
    pub fn pending_for(owner: &str) -> Self {
        Self::new()
            .filter(Filter::Owner(owner.to_string()))
            .filter(Filter::Status(Status::Todo))
            .order_by(Order::PriorityAsc)
            .order_by(Order::DueDateAsc)
    }

    pub fn by_id(id: TaskId, owner: Option<&str>) -> Self {
        let query = Self::new().filter(Filter::Id(id));
        match owner {
            Some(owner) => query.filter(Filter::Owner(owner.to_string())),
            None => query,
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> =
            self.filters.iter().map(Filter::to_pair).collect();
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|order| order.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        pairs
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.filters.iter().all(|filter| filter.matches(task))
    }

    /// Stable sort by the requested ordering keys, for in-process evaluation.
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| {
            self.order
                .iter()
                .map(|order| order.compare(a, b))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
}
