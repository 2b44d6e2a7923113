//! Task operations shared by the CLI and the chat front end.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::backend::{BackendError, TaskBackend};
use crate::input::{parse_task_input, tomorrow, InputError};
use crate::task::{NewTask, Priority, Status, Task, TaskId, TaskPatch};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Task #{0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Owner-scoped operations evaluated against a fixed reference day.
pub struct TaskService<'a, B: ?Sized> {
    backend: &'a B,
    today: NaiveDate,
}

impl<'a, B: TaskBackend + ?Sized> TaskService<'a, B> {
    pub fn new(backend: &'a B, today: NaiveDate) -> Self {
        Self { backend, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Create a task from free text; defaults are P1 and tomorrow.
    pub async fn add(&self, owner: &str, text: &str) -> Result<Task, ServiceError> {
        let draft = parse_task_input(text, self.today)?;
        let task = NewTask {
            title: draft.title.clone(),
            due_date: draft.due_date_or(tomorrow(self.today)),
            priority: draft.priority_or(Priority::default()),
            status: Status::Todo,
            parent_id: None,
            user_id: owner.to_string(),
        };
        debug!(owner, title = %task.title, "creating task");
        Ok(self.backend.create(&task).await?)
    }

    pub async fn pending(&self, owner: &str) -> Result<Vec<Task>, ServiceError> {
        Ok(self.backend.pending(owner).await?)
    }

    pub async fn complete(&self, owner: &str, id: TaskId) -> Result<Task, ServiceError> {
        self.patch(owner, id, TaskPatch::status(Status::Done)).await
    }

    /// Move the due date to tomorrow.
    pub async fn snooze(&self, owner: &str, id: TaskId) -> Result<Task, ServiceError> {
        self.patch(owner, id, TaskPatch::due_date(tomorrow(self.today)))
            .await
    }

    /// Create a child of `parent_id`. The child takes the parent's priority
    /// and due date unless the text sets its own.
    pub async fn add_subtask(
        &self,
        owner: &str,
        parent_id: TaskId,
        text: &str,
    ) -> Result<(Task, Task), ServiceError> {
        let draft = parse_task_input(text, self.today)?;
        let parent = self
            .backend
            .get(parent_id, Some(owner))
            .await?
            .ok_or(ServiceError::NotFound(parent_id))?;
        let task = NewTask {
            title: draft.title.clone(),
            due_date: draft.due_date_or(parent.due_date),
            priority: draft.priority_or(parent.priority),
            status: Status::Todo,
            parent_id: Some(parent.id),
            user_id: owner.to_string(),
        };
        let child = self.backend.create(&task).await?;
        Ok((parent, child))
    }

    async fn patch(&self, owner: &str, id: TaskId, patch: TaskPatch) -> Result<Task, ServiceError> {
        self.backend
            .update(id, Some(owner), &patch)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Call, MemoryBackend};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 2, 2)
    }

    #[tokio::test]
    async fn add_applies_defaults_and_owner() {
        let backend = MemoryBackend::new();
        let service = TaskService::new(&backend, today());
        let task = service.add("42", "Water plants").await.expect("add");
        assert_eq!(task.title, "Water plants");
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.due_date, date(2026, 2, 3));
        assert_eq!(task.user_id, "42");
        assert_eq!(task.status, Status::Todo);
    }

    #[tokio::test]
    async fn add_rejects_empty_title_without_request() {
        let backend = MemoryBackend::new();
        let service = TaskService::new(&backend, today());
        let err = service.add("42", "  [P0]  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Input(InputError::MissingTitle)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn complete_and_snooze_are_owner_scoped() {
        let backend = MemoryBackend::new();
        let service = TaskService::new(&backend, today());
        let task = service.add("42", "Pay rent today").await.expect("add");

        let err = service.complete("someone-else", task.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == task.id));

        let snoozed = service.snooze("42", task.id).await.expect("snooze");
        assert_eq!(snoozed.due_date, date(2026, 2, 3));

        let done = service.complete("42", task.id).await.expect("done");
        assert_eq!(done.status, Status::Done);
        assert!(service.pending("42").await.expect("pending").is_empty());
    }

    #[tokio::test]
    async fn subtask_inherits_parent_fields_unless_overridden() {
        let backend = MemoryBackend::new();
        let service = TaskService::new(&backend, today());
        let parent = service
            .add("42", "[P0] Move house 2026-03-10")
            .await
            .expect("parent");

        let (_, child) = service
            .add_subtask("42", parent.id, "Book van")
            .await
            .expect("subtask");
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(child.priority, Priority::P0);
        assert_eq!(child.due_date, date(2026, 3, 10));

        let (_, own) = service
            .add_subtask("42", parent.id, "[P3] Pack books tomorrow")
            .await
            .expect("subtask");
        assert_eq!(own.priority, Priority::P3);
        assert_eq!(own.due_date, date(2026, 2, 3));
    }

    #[tokio::test]
    async fn subtask_of_missing_parent_creates_nothing() {
        let backend = MemoryBackend::new();
        let service = TaskService::new(&backend, today());
        let err = service.add_subtask("42", 77, "Orphan").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(77)));
        assert!(!backend
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Create(_))));
    }
}
