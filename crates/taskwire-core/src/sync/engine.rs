use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::diff::diff_line;
use crate::backend::{BackendError, TaskBackend};
use crate::document::{decode_document, render_document, DocFormat};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    fn io(path: &Path, source: io::Error) -> Self {
        SyncError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of pushing one round of local edits.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub parsed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub missing: usize,
    pub failed: usize,
    /// Pending tasks written by the re-render that closes the pass.
    pub exported: usize,
}

/// Mirrors one owner's pending tasks into a document file and pushes
/// checkbox edits back.
pub struct SyncEngine<B> {
    backend: B,
    owner: String,
    path: PathBuf,
    format: DocFormat,
}

impl<B: TaskBackend> SyncEngine<B> {
    pub fn new(
        backend: B,
        owner: impl Into<String>,
        path: impl Into<PathBuf>,
        format: DocFormat,
    ) -> Self {
        Self {
            backend,
            owner: owner.into(),
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn format(&self) -> DocFormat {
        self.format
    }

    /// Current document text and the number of tasks in it.
    pub async fn render(&self, today: NaiveDate) -> Result<(String, usize), SyncError> {
        let tasks = self.backend.pending(&self.owner).await?;
        let text = render_document(&tasks, today, self.format.codec());
        Ok((text, tasks.len()))
    }

    /// Unconditional remote→local write.
    pub async fn export(&self, today: NaiveDate) -> Result<usize, SyncError> {
        let (text, count) = self.render(today).await?;
        self.write(&text)?;
        info!(count, path = %self.path.display(), "exported tasks");
        Ok(count)
    }

    /// Poll path: rewrite the file only when the rendering differs from what
    /// is on disk. Returns the task count when a write happened.
    pub async fn refresh_if_drifted(&self, today: NaiveDate) -> Result<Option<usize>, SyncError> {
        let (text, count) = self.render(today).await?;
        let current = match fs::read_to_string(&self.path) {
            Ok(current) => current,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(SyncError::io(&self.path, err)),
        };
        if current == text {
            debug!("document up to date");
            return Ok(None);
        }
        self.write(&text)?;
        info!(count, "remote changes written to document");
        Ok(Some(count))
    }

    /// Local→remote: decode the document, patch every task whose line
    /// differs, then re-render. Per-task failures are logged and skipped.
    pub async fn sync_local_edits(&self, today: NaiveDate) -> Result<PushReport, SyncError> {
        let text = fs::read_to_string(&self.path).map_err(|err| SyncError::io(&self.path, err))?;
        let lines = decode_document(&text, self.format.codec());
        let mut report = PushReport {
            parsed: lines.len(),
            ..PushReport::default()
        };

        for line in &lines {
            let task = match self.backend.get(line.id, None).await {
                Ok(Some(task)) => task,
                Ok(None) => {
                    debug!(id = line.id, "task not found; skipping line");
                    report.missing += 1;
                    continue;
                }
                Err(err) => {
                    warn!(id = line.id, error = %err, "failed to fetch task");
                    report.failed += 1;
                    continue;
                }
            };

            let patch = diff_line(line, &task);
            if patch.is_empty() {
                report.unchanged += 1;
                continue;
            }
            match self.backend.update(task.id, None, &patch).await {
                Ok(_) => {
                    info!(id = task.id, fields = ?patch.changed_fields(), "task updated");
                    report.updated += 1;
                }
                Err(err) => {
                    warn!(id = task.id, error = %err, "failed to update task");
                    report.failed += 1;
                }
            }
        }

        report.exported = self.export(today).await?;
        Ok(report)
    }

    fn write(&self, text: &str) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| SyncError::io(parent, err))?;
        }
        fs::write(&self.path, text).map_err(|err| SyncError::io(&self.path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Call, MemoryBackend};
    use crate::query::Filter;
    use crate::task::{Priority, Status, Task, TaskPatch};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: i64, title: &str, due: NaiveDate) -> Task {
        Task {
            id,
            title: title.to_string(),
            due_date: due,
            priority: Priority::P1,
            status: Status::Todo,
            parent_id: None,
            user_id: "cli".to_string(),
            created_at: None,
        }
    }

    fn engine(dir: &TempDir, tasks: Vec<Task>, format: DocFormat) -> SyncEngine<MemoryBackend> {
        SyncEngine::new(
            MemoryBackend::with_tasks(tasks),
            "cli",
            dir.path().join("vault").join("todo.md"),
            format,
        )
    }

    fn fetches(backend: &MemoryBackend) -> usize {
        backend
            .calls()
            .iter()
            .filter(|call| match call {
                Call::Select(query) => query.filters().iter().any(|f| matches!(f, Filter::Id(_))),
                _ => false,
            })
            .count()
    }

    #[tokio::test]
    async fn export_creates_parent_directory() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(&dir, vec![task(5, "Buy milk", today)], DocFormat::Inline);

        assert_eq!(engine.export(today).await.expect("export"), 1);
        let text = fs::read_to_string(engine.path()).expect("read");
        assert_eq!(
            text,
            "# TODO List\n\n## Today\n- [ ] Buy milk — P1 — id:5 — due:2026-02-02\n\n"
        );
    }

    #[tokio::test]
    async fn toggled_checkbox_sends_status_only() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(&dir, vec![task(5, "Buy milk", today)], DocFormat::Inline);
        engine.export(today).await.expect("export");

        let text = fs::read_to_string(engine.path()).expect("read");
        fs::write(engine.path(), text.replace("- [ ]", "- [x]")).expect("write");

        let report = engine.sync_local_edits(today).await.expect("sync");
        assert_eq!(report.parsed, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(
            engine.backend().updates(),
            vec![(5, TaskPatch::status(Status::Done))]
        );
        // Done tasks drop out of the re-rendered document.
        assert_eq!(report.exported, 0);
        assert_eq!(
            fs::read_to_string(engine.path()).expect("read"),
            "# TODO List\n\nNo pending tasks! 🎉\n"
        );
    }

    #[tokio::test]
    async fn untouched_document_with_padded_title_sends_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(&dir, vec![task(5, "Buy milk ", today)], DocFormat::Inline);
        engine.export(today).await.expect("export");

        let report = engine.sync_local_edits(today).await.expect("sync");
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 1);
        assert!(engine.backend().updates().is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_cause_no_requests() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(
            &dir,
            vec![task(1, "One", today), task(2, "Two", today)],
            DocFormat::Inline,
        );
        fs::create_dir_all(engine.path().parent().unwrap()).expect("mkdir");
        fs::write(
            engine.path(),
            "# TODO List\n\n## Today\n\
- [ ] One — P1 — id:1 — due:2026-02-02\n\
- [ ] broken line id:3\n\
- [x] Two — P1 — id:two — due:2026-02-02\n\
- [ ] Two — P1 — id:2 — due:2026-02-02\n\
just text\n",
        )
        .expect("write");

        let report = engine.sync_local_edits(today).await.expect("sync");
        assert_eq!(report.parsed, 2);
        assert_eq!(report.unchanged, 2);
        assert_eq!(fetches(engine.backend()), 2);
        assert!(engine.backend().updates().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_skipped_and_failures_do_not_stop_the_pass() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(
            &dir,
            vec![task(1, "One", today), task(2, "Two", today)],
            DocFormat::Comment,
        );
        engine.backend().fail_requests_for(1);
        fs::create_dir_all(engine.path().parent().unwrap()).expect("mkdir");
        fs::write(
            engine.path(),
            "- [x] [P1] One <!-- id:1 -->\n\
- [x] [P1] Ghost <!-- id:99 -->\n\
- [x] [P1] Two <!-- id:2 -->\n",
        )
        .expect("write");

        let report = engine.sync_local_edits(today).await.expect("sync");
        assert_eq!(report.failed, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(
            engine.backend().task(2).map(|t| t.status),
            Some(Status::Done)
        );
        assert!(engine.backend().task(99).is_none());
    }

    #[tokio::test]
    async fn refresh_writes_only_when_rendering_differs() {
        let dir = TempDir::new().expect("tempdir");
        let today = date(2026, 2, 2);
        let engine = engine(&dir, vec![task(5, "Buy milk", today)], DocFormat::Inline);

        assert_eq!(engine.refresh_if_drifted(today).await.expect("refresh"), Some(1));
        assert_eq!(engine.refresh_if_drifted(today).await.expect("refresh"), None);

        engine.backend().insert(task(6, "Call bank", date(2026, 2, 5)));
        assert_eq!(engine.refresh_if_drifted(today).await.expect("refresh"), Some(2));
        assert!(fs::read_to_string(engine.path())
            .expect("read")
            .contains("## Upcoming\n- [ ] Call bank"));
    }

    #[tokio::test]
    async fn missing_document_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let engine = engine(&dir, Vec::new(), DocFormat::Inline);
        let err = engine
            .sync_local_edits(date(2026, 2, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
