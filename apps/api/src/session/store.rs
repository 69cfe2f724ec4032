use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

/// Where edited documents are persisted. The engine hands over plain JSON.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new version and returns its number.
    async fn save(&self, cv_id: Uuid, document: &Value) -> Result<i32>;
    async fn load_latest(&self, cv_id: Uuid) -> Result<Option<Value>>;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CvDocumentRow {
    pub id: Uuid,
    pub cv_id: Uuid,
    pub version: i32,
    pub document: Value,
    pub created_at: DateTime<Utc>,
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    /// Append-only: every save is an INSERT with version = max + 1.
    /// Concurrent writers on one CV collide on (cv_id, version); the loser's save
    /// fails and is retried by its autosave.
    async fn save(&self, cv_id: Uuid, document: &Value) -> Result<i32> {
        let current_max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(version) FROM cv_documents WHERE cv_id = $1")
                .bind(cv_id)
                .fetch_one(&self.pool)
                .await?;
        let new_version = current_max.unwrap_or(0) + 1;

        sqlx::query("INSERT INTO cv_documents (id, cv_id, version, document) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(cv_id)
            .bind(new_version)
            .bind(document)
            .execute(&self.pool)
            .await?;

        info!("Saved CV {cv_id} version {new_version}");
        Ok(new_version)
    }

    async fn load_latest(&self, cv_id: Uuid) -> Result<Option<Value>> {
        let row = sqlx::query_as::<_, CvDocumentRow>(
            "SELECT * FROM cv_documents WHERE cv_id = $1 ORDER BY version DESC LIMIT 1",
        )
        .bind(cv_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.document))
    }
}
