// storage/mod.rs — Row store for Task records.
//
// One SQLite pool (WAL mode) shared by every request handler. Exposes the
// four primitives the API needs: fetch-many, fetch-one, execute returning
// the generated id, and execute returning the affected-row count.

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// A single row of the `tasks` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: String,
}

/// The three task statuses the status-transition endpoint accepts.
///
/// Only that endpoint enforces this set — a general `PUT` writes the status
/// column as an opaque string (see `Storage::update_task`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(TaskStatus::Todo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Field-by-field changes for a partial update.
///
/// `None` means "leave the column alone"; `Some("")` is a real write. The
/// generated `SET` clause always lists columns in the fixed order title,
/// description, status, priority, so identical inputs produce identical SQL.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }

    /// (column assignment, value) pairs in fixed column order.
    fn assignments(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(v) = &self.title {
            out.push(("title = ?", v.as_str()));
        }
        if let Some(v) = &self.description {
            out.push(("description = ?", v.as_str()));
        }
        if let Some(v) = &self.status {
            out.push(("status = ?", v.as_str()));
        }
        if let Some(v) = &self.priority {
            out.push(("priority = ?", v.as_str()));
        }
        out
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("tasks.db");
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
        Self::provision(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Idempotent — an externally provisioned table with the same shape is
    /// left untouched.
    async fn provision(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'TODO',
                priority TEXT NOT NULL DEFAULT 'Normal',
                created_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    /// All tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Insert a task and return the store-generated id. The status column is
    /// always 'TODO' at creation; `created_at` is assigned here, not by the
    /// caller. Fixed-width microsecond timestamps keep lexicographic order
    /// equal to chronological order.
    pub async fn create_task(
        &self,
        title: &str,
        description: &str,
        priority: &str,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, status, priority, created_at)
             VALUES (?, ?, 'TODO', ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(priority)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Apply a partial update and return the affected-row count (0 = no such
    /// task). Values are written as given — no per-field validation here.
    pub async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<u64> {
        let assignments = changes.assignments();
        if assignments.is_empty() {
            bail!("no fields to update");
        }

        let set_clause: Vec<&str> = assignments.iter().map(|(col, _)| *col).collect();
        let sql = format!("UPDATE tasks SET {} WHERE id = ?", set_clause.join(", "));

        let mut query = sqlx::query(&sql);
        for (_, value) in &assignments {
            query = query.bind(*value);
        }
        let result = query.bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Update only the status column. Returns the affected-row count.
    pub async fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete by id. Returns the affected-row count (0 = no such task).
    pub async fn delete_task(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
