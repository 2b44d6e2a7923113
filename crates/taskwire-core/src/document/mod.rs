//! The checkbox document mirrored by the sync daemon.

mod codec;

pub use codec::{CommentCodec, DocFormat, DocLine, InlineCodec, LineCodec, UnknownFormat};

use chrono::NaiveDate;

use crate::agenda::Agenda;
use crate::task::Task;

pub const HEADING: &str = "# TODO List";
pub const EMPTY_PLACEHOLDER: &str = "No pending tasks! 🎉";

/// Render tasks into the document text. Input order is kept within each
/// section, so the same tasks and date always give the same bytes.
pub fn render_document(tasks: &[Task], today: NaiveDate, codec: &dyn LineCodec) -> String {
    let mut out = String::new();
    out.push_str(HEADING);
    out.push_str("\n\n");

    let agenda = Agenda::partition(tasks, today);
    if agenda.is_empty() {
        out.push_str(EMPTY_PLACEHOLDER);
        out.push('\n');
        return out;
    }

    for (bucket, section) in agenda.sections() {
        out.push_str("## ");
        out.push_str(bucket.heading());
        out.push('\n');
        for task in section {
            out.push_str(&codec.encode(task, today));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Decode every task line; anything else is skipped.
pub fn decode_document(text: &str, codec: &dyn LineCodec) -> Vec<DocLine> {
    text.lines().filter_map(|line| codec.decode(line)).collect()
}
