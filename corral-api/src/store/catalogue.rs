//! Catalogue item registry. Items are created once at finalize time and
//! never updated.

use corral_common::db::CatalogueItem;
use corral_common::Result;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct CatalogueStore {
    db: SqlitePool,
}

impl CatalogueStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn insert(&self, item: &CatalogueItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalogue_items
                (id, upload_id, filename, url, status, project_id, album_id,
                 title, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.upload_id)
        .bind(&item.filename)
        .bind(&item.url)
        .bind(&item.status)
        .bind(&item.project_id)
        .bind(&item.album_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Newest first, optionally filtered by project and/or album.
    pub async fn list(
        &self,
        project_id: Option<&str>,
        album_id: Option<&str>,
    ) -> Result<Vec<CatalogueItem>> {
        let mut sql = String::from("SELECT * FROM catalogue_items WHERE 1 = 1");
        if project_id.is_some() {
            sql.push_str(" AND project_id = ?");
        }
        if album_id.is_some() {
            sql.push_str(" AND album_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, CatalogueItem>(&sql);
        if let Some(project_id) = project_id {
            query = query.bind(project_id);
        }
        if let Some(album_id) = album_id {
            query = query.bind(album_id);
        }

        Ok(query.fetch_all(&self.db).await?)
    }
}
