//! Markdown projection of the board.
//!
//! Pure read-only rendering: quadrants in fixed order 1→4, one checkbox line
//! per task (title only), `—` for an empty quadrant.

use chrono::{DateTime, Utc};

use crate::storage::TaskRow;

pub fn quadrant_label(quadrant: i64) -> &'static str {
    match quadrant {
        1 => "Q1 · Urgent & Important",
        2 => "Q2 · Important",
        3 => "Q3 · Urgent",
        4 => "Q4 · Neither",
        _ => "Q? · Unknown",
    }
}

/// Render the full board as a Markdown document.
///
/// `tasks` is expected in `(quadrant, position, created_at)` order, as
/// returned by `TaskStore::list_tasks`; rendering preserves that order within
/// each quadrant section.
pub fn render_markdown(tasks: &[TaskRow], exported_at: DateTime<Utc>) -> String {
    let mut out = String::from("# Eisenhower Matrix\n\n");
    out.push_str(&format!(
        "Exported: {}\n\n---\n\n",
        exported_at.format("%Y-%m-%d %H:%M")
    ));

    for quadrant in 1..=4 {
        out.push_str(&format!("## {}\n\n", quadrant_label(quadrant)));
        let mut any = false;
        for task in tasks.iter().filter(|t| t.quadrant == quadrant) {
            let checkbox = if task.completed { "- [x]" } else { "- [ ]" };
            out.push_str(&format!("{} {}\n", checkbox, task.title));
            any = true;
        }
        if any {
            out.push('\n');
        } else {
            out.push_str("—\n\n");
        }
    }

    out
}

/// Attachment filename for the export download, e.g. `eisenhower-20260825-1430.md`.
pub fn export_filename(exported_at: DateTime<Utc>) -> String {
    format!("eisenhower-{}.md", exported_at.format("%Y%m%d-%H%M"))
}
