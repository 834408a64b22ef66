//! Lead repository
//!
//! Front-ends send heterogeneous lead records; the typed fields below cover
//! the ones the backend acts on, and everything else rides along in the
//! `extra` extension map. Phone fields are canonicalized on every write.

use corral_common::db::{ExtraFields, Lead};
use corral_common::{phone, time, Error, Result};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create/update payload. All fields optional; unknown keys collect in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub owner_mobile: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Clone)]
pub struct LeadStore {
    db: SqlitePool,
}

impl LeadStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: LeadInput) -> Result<Lead> {
        let now = time::now();
        let lead = Lead {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            phone: input.phone.as_deref().map(phone::normalize),
            owner_mobile: input.owner_mobile.as_deref().map(phone::normalize),
            status: input.status.unwrap_or_else(|| "New".to_string()),
            source: input.source,
            notes: input.notes,
            extra: Json(input.extra),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO leads
                (id, name, phone, owner_mobile, status, source, notes, extra,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.id)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.owner_mobile)
        .bind(&lead.status)
        .bind(&lead.source)
        .bind(&lead.notes)
        .bind(&lead.extra)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.db)
        .await?;

        Ok(lead)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Lead>> {
        Ok(sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?)
    }

    /// Partial update: provided fields overwrite, extension keys merge.
    pub async fn update(&self, id: &str, input: LeadInput) -> Result<Lead> {
        let mut lead = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lead not found: {}", id)))?;

        if let Some(name) = input.name {
            lead.name = Some(name);
        }
        if let Some(raw) = input.phone {
            lead.phone = Some(phone::normalize(&raw));
        }
        if let Some(raw) = input.owner_mobile {
            lead.owner_mobile = Some(phone::normalize(&raw));
        }
        if let Some(status) = input.status {
            lead.status = status;
        }
        if let Some(source) = input.source {
            lead.source = Some(source);
        }
        if let Some(notes) = input.notes {
            lead.notes = Some(notes);
        }
        lead.extra.0.extend(input.extra);
        lead.updated_at = time::now();

        sqlx::query(
            r#"
            UPDATE leads
            SET name = ?, phone = ?, owner_mobile = ?, status = ?, source = ?,
                notes = ?, extra = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.owner_mobile)
        .bind(&lead.status)
        .bind(&lead.source)
        .bind(&lead.notes)
        .bind(&lead.extra)
        .bind(lead.updated_at)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(lead)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list(&self, status: Option<&str>, limit: i64) -> Result<Vec<Lead>> {
        let mut sql = String::from("SELECT * FROM leads");
        if status.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, Lead>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        query = query.bind(limit);

        Ok(query.fetch_all(&self.db).await?)
    }
}
