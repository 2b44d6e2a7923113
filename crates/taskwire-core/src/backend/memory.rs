//! In-process backend used by tests across the workspace.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{BackendError, TaskBackend, TokenBackend};
use crate::auth::{ApiToken, NewApiToken};
use crate::query::TaskQuery;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// One recorded backend request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(TaskQuery),
    Create(NewTask),
    Update(TaskId, TaskPatch),
}

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    tokens: Vec<ApiToken>,
    next_task_id: TaskId,
    next_token_id: i64,
    failing_ids: HashSet<TaskId>,
    offline: bool,
    calls: Vec<Call>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let backend = Self::new();
        for task in tasks {
            backend.insert(task);
        }
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory backend lock")
    }

    pub fn insert(&self, task: Task) {
        let mut state = self.lock();
        state.next_task_id = state.next_task_id.max(task.id);
        state.tasks.push(task);
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn tokens(&self) -> Vec<ApiToken> {
        self.lock().tokens.clone()
    }

    /// Every later fetch or update touching `id` fails with a 500.
    pub fn fail_requests_for(&self, id: TaskId) {
        self.lock().failing_ids.insert(id);
    }

    /// Every later task request fails with a 503.
    pub fn go_offline(&self) {
        self.lock().offline = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn updates(&self) -> Vec<(TaskId, TaskPatch)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, patch) => Some((id, patch)),
                _ => None,
            })
            .collect()
    }
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

fn injected_failure(id: TaskId) -> BackendError {
    BackendError::Status {
        status: 500,
        body: format!("injected failure for task {id}"),
    }
}

#[async_trait]
impl TaskBackend for MemoryBackend {
    async fn select(&self, query: &TaskQuery) -> Result<Vec<Task>, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Select(query.clone()));
        if state.offline {
            return Err(unavailable());
        }
        for filter in query.filters() {
            if let crate::query::Filter::Id(id) = filter {
                if state.failing_ids.contains(id) {
                    return Err(injected_failure(*id));
                }
            }
        }
        let mut rows: Vec<Task> = state
            .tasks
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        query.sort(&mut rows);
        Ok(rows)
    }

    async fn create(&self, task: &NewTask) -> Result<Task, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Create(task.clone()));
        if state.offline {
            return Err(unavailable());
        }
        state.next_task_id += 1;
        let row = Task {
            id: state.next_task_id,
            title: task.title.clone(),
            due_date: task.due_date,
            priority: task.priority,
            status: task.status,
            parent_id: task.parent_id,
            user_id: task.user_id.clone(),
            created_at: Some(Utc::now()),
        };
        state.tasks.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: TaskId,
        owner: Option<&str>,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Update(id, patch.clone()));
        if state.offline {
            return Err(unavailable());
        }
        if state.failing_ids.contains(&id) {
            return Err(injected_failure(id));
        }
        let scope = TaskQuery::by_id(id, owner);
        let updated = state
            .tasks
            .iter_mut()
            .find(|task| scope.matches(task))
            .map(|task| {
                patch.apply_to(task);
                task.clone()
            });
        Ok(updated)
    }
}

#[async_trait]
impl TokenBackend for MemoryBackend {
    async fn insert_token(&self, token: &NewApiToken) -> Result<ApiToken, BackendError> {
        let mut state = self.lock();
        state.next_token_id += 1;
        let record = ApiToken {
            id: state.next_token_id,
            user_id: token.user_id.clone(),
            token_hash: token.token_hash.clone(),
            name: token.name.clone(),
            created_at: Some(Utc::now()),
            expires_at: Some(token.expires_at),
        };
        state.tokens.push(record.clone());
        Ok(record)
    }

    async fn tokens_for(&self, owner: &str) -> Result<Vec<ApiToken>, BackendError> {
        let mut tokens: Vec<ApiToken> = self
            .lock()
            .tokens
            .iter()
            .filter(|token| token.user_id == owner)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tokens)
    }

    async fn token_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, BackendError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .find(|token| token.token_hash == token_hash)
            .cloned())
    }

    async fn delete_token(&self, id: i64, owner: &str) -> Result<Option<ApiToken>, BackendError> {
        let mut state = self.lock();
        let position = state
            .tokens
            .iter()
            .position(|token| token.id == id && token.user_id == owner);
        Ok(position.map(|idx| state.tokens.remove(idx)))
    }
}
