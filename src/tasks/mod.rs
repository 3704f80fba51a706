pub mod export;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;
use crate::storage::{NewTask, TaskChanges, TaskRow, TaskStore};

pub const QUADRANT_MIN: i64 = 1;
pub const QUADRANT_MAX: i64 = 4;

const TITLE_MAX_CHARS: usize = 200;
const DESCRIPTION_MAX_CHARS: usize = 1000;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Body for POST /api/tasks and PUT /api/tasks/{id}. On create, `completed`
/// is ignored (new tasks always start open); on full update it is written.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quadrant: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Body for PATCH /api/tasks/{id}. Absent field = leave unchanged; explicit
/// JSON `null` on description/due_date = clear the column. The double-Option
/// encoding is what keeps those two cases distinguishable.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub quadrant: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Body for PATCH /api/tasks/{id}/quadrant (drag-and-drop between quadrants).
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub quadrant: i64,
}

/// Body for PATCH /api/tasks/quadrant/{q}/reorder. The list is the complete
/// intended order for the quadrant, first to last.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub task_ids: Vec<i64>,
}

/// Deserialize a present-but-null field as `Some(None)` while serde's
/// `default` maps an absent field to `None`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate_quadrant(quadrant: i64) -> Result<(), ApiError> {
    if !(QUADRANT_MIN..=QUADRANT_MAX).contains(&quadrant) {
        return Err(ApiError::Validation(format!(
            "quadrant must be between {QUADRANT_MIN} and {QUADRANT_MAX}, got {quadrant}"
        )));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    // Bounds apply to the trimmed length; the stored title keeps its
    // surrounding whitespace as sent.
    let len = title.trim().chars().count();
    if len == 0 {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    if len > TITLE_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    if let Some(d) = description {
        if d.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ApiError::Validation(format!(
                "description must be at most {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
    }
    Ok(())
}

// ─── TaskService ─────────────────────────────────────────────────────────────

/// Validates wire input, enforces the quadrant range, performs existence
/// checks, and owns the position-assignment policy. Storage itself applies no
/// business rules beyond tail assignment on create.
#[derive(Clone)]
pub struct TaskService {
    store: TaskStore,
}

impl TaskService {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub async fn create(&self, input: TaskInput) -> Result<TaskRow, ApiError> {
        validate_title(&input.title)?;
        validate_description(input.description.as_deref())?;
        validate_quadrant(input.quadrant)?;
        let row = self
            .store
            .create_task(&NewTask {
                title: input.title,
                description: input.description,
                quadrant: input.quadrant,
                due_date: input.due_date.map(|d| d.to_string()),
            })
            .await?;
        Ok(row)
    }

    pub async fn get(&self, id: i64) -> Result<TaskRow, ApiError> {
        self.store
            .get_task(id)
            .await?
            .ok_or(ApiError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<TaskRow>, ApiError> {
        Ok(self.store.list_tasks().await?)
    }

    pub async fn list_quadrant(&self, quadrant: i64) -> Result<Vec<TaskRow>, ApiError> {
        validate_quadrant(quadrant)?;
        Ok(self.store.list_quadrant(quadrant).await?)
    }

    /// Full update (PUT). Every column is written from the body; a quadrant
    /// change re-assigns position at the destination tail, same as the
    /// dedicated move path.
    pub async fn replace(&self, id: i64, input: TaskInput) -> Result<TaskRow, ApiError> {
        validate_title(&input.title)?;
        validate_description(input.description.as_deref())?;
        validate_quadrant(input.quadrant)?;
        let existing = self.get(id).await?;

        let mut changes = TaskChanges {
            title: Some(input.title),
            description: Some(input.description),
            completed: Some(input.completed),
            due_date: Some(input.due_date.map(|d| d.to_string())),
            ..TaskChanges::default()
        };
        if input.quadrant != existing.quadrant {
            changes.quadrant = Some(input.quadrant);
            changes.position = Some(self.store.count_quadrant(input.quadrant).await?);
        }
        self.store.update_task(id, &changes).await?;
        self.get(id).await
    }

    /// Partial update (PATCH). Only supplied fields are written; `updated_at`
    /// is refreshed regardless. Quadrant changes follow the unified
    /// tail-assignment policy.
    pub async fn patch(&self, id: i64, patch: TaskPatch) -> Result<TaskRow, ApiError> {
        if let Some(ref title) = patch.title {
            validate_title(title)?;
        }
        if let Some(ref description) = patch.description {
            validate_description(description.as_deref())?;
        }
        if let Some(quadrant) = patch.quadrant {
            validate_quadrant(quadrant)?;
        }
        let existing = self.get(id).await?;

        let mut changes = TaskChanges {
            title: patch.title,
            description: patch.description,
            completed: patch.completed,
            due_date: patch
                .due_date
                .map(|d| d.map(|date| date.to_string())),
            ..TaskChanges::default()
        };
        if let Some(quadrant) = patch.quadrant {
            if quadrant != existing.quadrant {
                changes.quadrant = Some(quadrant);
                changes.position = Some(self.store.count_quadrant(quadrant).await?);
            }
        }
        self.store.update_task(id, &changes).await?;
        self.get(id).await
    }

    /// Cross-quadrant move (drag-and-drop). The task lands at the destination
    /// tail; the vacated quadrant is left as-is, not compacted.
    pub async fn move_to_quadrant(&self, id: i64, quadrant: i64) -> Result<TaskRow, ApiError> {
        validate_quadrant(quadrant)?;
        self.get(id).await?;
        let position = self.store.count_quadrant(quadrant).await?;
        let changes = TaskChanges {
            quadrant: Some(quadrant),
            position: Some(position),
            ..TaskChanges::default()
        };
        self.store.update_task(id, &changes).await?;
        self.get(id).await
    }

    /// Bulk reorder within a quadrant: position = index in `task_ids`.
    /// Returns the quadrant's tasks in their new order.
    pub async fn reorder(
        &self,
        quadrant: i64,
        task_ids: &[i64],
    ) -> Result<Vec<TaskRow>, ApiError> {
        validate_quadrant(quadrant)?;
        if task_ids.is_empty() {
            return Err(ApiError::Validation("task_ids is required".to_string()));
        }
        self.store.reorder_quadrant(quadrant, task_ids).await?;
        Ok(self.store.list_quadrant(quadrant).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.get(id).await?;
        self.store.delete_task(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: TaskPatch = serde_json::from_str(r#"{"title": "renamed"}"#).unwrap();
        assert_eq!(patch.title.as_deref(), Some("renamed"));
        assert_eq!(patch.due_date, None, "absent field must stay untouched");

        let patch: TaskPatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None), "explicit null must clear");

        let patch: TaskPatch = serde_json::from_str(r#"{"due_date": "2026-09-01"}"#).unwrap();
        assert_eq!(
            patch.due_date,
            Some(Some("2026-09-01".parse().unwrap()))
        );
    }

    #[test]
    fn reorder_body_defaults_to_empty_list() {
        let req: ReorderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.task_ids.is_empty());
    }
}
