//! Task repository. Same shape as leads: typed fields plus an extension map.

use corral_common::db::{ExtraFields, Task};
use corral_common::{time, Error, Result};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub title: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
    pub lead_id: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone)]
pub struct TaskStore {
    db: SqlitePool,
}

impl TaskStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: TaskInput) -> Result<Task> {
        let title = input
            .title
            .ok_or_else(|| Error::InvalidInput("title is required".to_string()))?;

        let now = time::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title,
            status: input.status.unwrap_or_else(|| "Open".to_string()),
            due_date: input.due_date,
            lead_id: input.lead_id,
            extra: Json(input.extra),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, status, due_date, lead_id, extra, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.status)
        .bind(&task.due_date)
        .bind(&task.lead_id)
        .bind(&task.extra)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.db)
        .await?;

        Ok(task)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    pub async fn update(&self, id: &str, input: TaskInput) -> Result<Task> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task not found: {}", id)))?;

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(status) = input.status {
            task.status = status;
        }
        if let Some(due_date) = input.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(lead_id) = input.lead_id {
            task.lead_id = Some(lead_id);
        }
        task.extra.0.extend(input.extra);
        task.updated_at = time::now();

        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, status = ?, due_date = ?, lead_id = ?, extra = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.status)
        .bind(&task.due_date)
        .bind(&task.lead_id)
        .bind(&task.extra)
        .bind(task.updated_at)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(task)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list(&self, status: Option<&str>, limit: i64) -> Result<Vec<Task>> {
        let mut sql = String::from("SELECT * FROM tasks");
        if status.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, Task>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        query = query.bind(limit);

        Ok(query.fetch_all(&self.db).await?)
    }
}
