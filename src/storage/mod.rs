use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Priority bucket 1–4 (Eisenhower quadrant).
    pub quadrant: i64,
    /// Zero-based rank within the quadrant; defines render order.
    pub position: i64,
    pub completed: bool,
    /// ISO-8601 date string, e.g. `2026-08-25`. NULL = no due date.
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Storage-level input for task creation. Position is never supplied by the
/// caller — it is computed from the target quadrant's current tail.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub quadrant: i64,
    pub due_date: Option<String>,
}

/// Field-subset update. `None` = leave the column unchanged; the inner
/// `Option` on description/due_date distinguishes "set NULL" from "untouched".
#[derive(Debug, Default, Clone)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub quadrant: Option<i64>,
    pub position: Option<i64>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<String>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.quadrant.is_none()
            && self.position.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
    }
}

// ─── TaskStore ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("matrixd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 title TEXT NOT NULL,
                 description TEXT,
                 quadrant INTEGER NOT NULL CHECK(quadrant IN (1, 2, 3, 4)),
                 position INTEGER DEFAULT 0,
                 completed BOOLEAN DEFAULT 0,
                 due_date TEXT,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(pool)
        .await?;

        // Idempotent column additions (ALTER TABLE IF NOT EXISTS is not
        // supported in SQLite, so we attempt the ALTER and ignore the
        // "duplicate column name" error). Pre-position databases get the
        // column with every row defaulted to 0.
        let alter_stmts = ["ALTER TABLE tasks ADD COLUMN position INTEGER DEFAULT 0"];
        for stmt in alter_stmts {
            let result = sqlx::query(stmt).execute(pool).await;
            if let Err(e) = result {
                let msg = e.to_string();
                if !msg.contains("duplicate column") {
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    // ─── Tasks ───────────────────────────────────────────────────────────────

    /// Insert a task at the tail of its quadrant.
    ///
    /// The new position is `1 + MAX(position)` over the target quadrant, with
    /// an empty quadrant treated as max = -1 so the first task lands at 0.
    /// Tail computation and insert run in one transaction.
    pub async fn create_task(&self, task: &NewTask) -> Result<TaskRow> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let (max_position,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(position), -1) FROM tasks WHERE quadrant = ?")
                .bind(task.quadrant)
                .fetch_one(&mut *tx)
                .await?;
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, quadrant, position, completed, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.quadrant)
        .bind(max_position + 1)
        .bind(&task.due_date)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();
        tx.commit().await?;
        self.get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Full-board listing in deterministic render order.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM tasks ORDER BY quadrant, position, created_at")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn list_quadrant(&self, quadrant: i64) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM tasks WHERE quadrant = ? ORDER BY position, created_at",
            )
            .bind(quadrant)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn count_quadrant(&self, quadrant: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE quadrant = ?")
            .bind(quadrant)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Write only the supplied fields; `updated_at` is always refreshed, even
    /// for an empty change set. Unknown ids are a silent no-op — callers are
    /// responsible for existence checks.
    pub async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let mut sets: Vec<&str> = Vec::new();
        if changes.title.is_some() {
            sets.push("title = ?");
        }
        if changes.description.is_some() {
            sets.push("description = ?");
        }
        if changes.quadrant.is_some() {
            sets.push("quadrant = ?");
        }
        if changes.position.is_some() {
            sets.push("position = ?");
        }
        if changes.completed.is_some() {
            sets.push("completed = ?");
        }
        if changes.due_date.is_some() {
            sets.push("due_date = ?");
        }
        sets.push("updated_at = ?");

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(ref title) = changes.title {
            query = query.bind(title);
        }
        if let Some(ref description) = changes.description {
            query = query.bind(description.clone());
        }
        if let Some(quadrant) = changes.quadrant {
            query = query.bind(quadrant);
        }
        if let Some(position) = changes.position {
            query = query.bind(position);
        }
        if let Some(completed) = changes.completed {
            query = query.bind(completed);
        }
        if let Some(ref due_date) = changes.due_date {
            query = query.bind(due_date.clone());
        }
        query.bind(&now).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// Assign position = index for each id in the provided order, within one
    /// transaction so a failure mid-sequence cannot leave the quadrant
    /// partially reordered. The id set is not validated against the quadrant's
    /// current contents — caller contract.
    pub async fn reorder_quadrant(&self, _quadrant: i64, ordered_ids: &[i64]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE tasks SET position = ?, updated_at = ? WHERE id = ?")
                .bind(position as i64)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a row by id. Returns the number of rows removed; an absent id
    /// deletes nothing and is not an error.
    pub async fn delete_task(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
