//! Server-rendered HTML fragments for the HTMX board UI.
//!
//! The front end swaps these verbatim: a card per task, a sortable list per
//! quadrant, and an expanded detail view. All user-supplied text is escaped.

use crate::storage::TaskRow;
use crate::tasks::export::quadrant_label;

/// Minimal HTML escaping for text interpolated into fragments.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One draggable task card. `data-id` is what SortableJS reports back in
/// reorder payloads; the checkbox PATCHes the completion state.
pub fn task_card(task: &TaskRow) -> String {
    let completed_class = if task.completed { " completed" } else { "" };
    let checked = if task.completed { " checked" } else { "" };
    let next = !task.completed;

    let mut card = format!(
        "<div class=\"task-card{completed_class}\" data-id=\"{id}\" draggable=\"true\">\
         <input type=\"checkbox\"{checked} \
         hx-patch=\"/api/tasks/{id}\" \
         hx-vals='{{\"completed\": {next}}}' \
         hx-target=\"closest .task-card\" hx-swap=\"outerHTML\">\
         <span class=\"task-title\" hx-get=\"/api/tasks/{id}/detail\" \
         hx-target=\"closest .task-card\" hx-swap=\"outerHTML\">{title}</span>",
        id = task.id,
        title = escape(&task.title),
    );
    if let Some(ref due) = task.due_date {
        card.push_str(&format!(
            "<span class=\"task-due\">{}</span>",
            escape(due)
        ));
    }
    card.push_str("</div>");
    card
}

/// The sortable card container for one quadrant.
pub fn task_list(quadrant: i64, tasks: &[TaskRow]) -> String {
    let mut out = format!(
        "<div class=\"task-list\" id=\"quadrant-{quadrant}\" data-quadrant=\"{quadrant}\">"
    );
    for task in tasks {
        out.push_str(&task_card(task));
    }
    out.push_str("</div>");
    out
}

/// Expanded card shown when a task is clicked.
pub fn task_detail(task: &TaskRow) -> String {
    let mut out = format!(
        "<div class=\"task-card task-detail\" data-id=\"{id}\">\
         <span class=\"task-title\">{title}</span>",
        id = task.id,
        title = escape(&task.title),
    );
    if let Some(ref description) = task.description {
        out.push_str(&format!(
            "<p class=\"task-description\">{}</p>",
            escape(description)
        ));
    }
    if let Some(ref due) = task.due_date {
        out.push_str(&format!("<span class=\"task-due\">{}</span>", escape(due)));
    }
    out.push_str(&format!(
        "<span class=\"task-quadrant\">{}</span>\
         <button hx-delete=\"/api/tasks/{}\" hx-target=\"closest .task-card\" \
         hx-swap=\"delete\">Delete</button></div>",
        quadrant_label(task.quadrant),
        task.id,
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, title: &str, completed: bool) -> TaskRow {
        TaskRow {
            id,
            title: title.into(),
            description: None,
            quadrant: 1,
            position: 0,
            completed,
            due_date: None,
            created_at: "2026-08-25T09:00:00+00:00".into(),
            updated_at: "2026-08-25T09:00:00+00:00".into(),
        }
    }

    #[test]
    fn escapes_user_text() {
        let t = task(1, "<script>alert('x')</script>", false);
        let html = task_card(&t);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn completed_card_is_checked() {
        let html = task_card(&task(7, "done thing", true));
        assert!(html.contains(" checked"));
        assert!(html.contains("task-card completed"));
        // The toggle sends the inverse state.
        assert!(html.contains("\"completed\": false"));
    }

    #[test]
    fn list_preserves_task_order() {
        let tasks = vec![task(3, "c", false), task(1, "a", false), task(2, "b", false)];
        let html = task_list(2, &tasks);
        let pos3 = html.find("data-id=\"3\"").unwrap();
        let pos1 = html.find("data-id=\"1\"").unwrap();
        let pos2 = html.find("data-id=\"2\"").unwrap();
        assert!(pos3 < pos1 && pos1 < pos2);
        assert!(html.contains("data-quadrant=\"2\""));
    }
}
