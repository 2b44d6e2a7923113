use crate::document::DocLine;
use crate::task::{Status, Task, TaskPatch};

/// Fields of `line` that differ from the stored task. Fields the codec did
/// not decode are never included. Titles compare without surrounding
/// whitespace since the document cannot carry it.
pub fn diff_line(line: &DocLine, task: &Task) -> TaskPatch {
    let mut patch = TaskPatch::default();

    let status = Status::from_checked(line.checked);
    if status != task.status {
        patch.status = Some(status);
    }
    if let Some(title) = line.title.as_deref() {
        if title.trim() != task.title.trim() {
            patch.title = Some(title.to_string());
        }
    }
    if let Some(priority) = line.priority {
        if priority != task.priority {
            patch.priority = Some(priority);
        }
    }
    if let Some(due_date) = line.due_date {
        if due_date != task.due_date {
            patch.due_date = Some(due_date);
        }
    }
    patch
}
