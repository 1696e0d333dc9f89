// PostgreSQL document store
//
// Documents live in one JSONB table keyed by id, with the `type` field
// copied into an indexed column for listing queries.

use async_trait::async_trait;
use log::info;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::time::Duration;
use uuid::Uuid;

use super::error::{PersistenceError, PersistenceResult};
use super::models::{Document, DocumentKind};
use super::store::DocumentStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, then apply pending migrations
    pub async fn connect(database_url: &str) -> PersistenceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| PersistenceError::ConnectionFailed(e.to_string()))?;
        info!("Vibeforge: PostgreSQL connection pool established");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Vibeforge: Database migrations applied successfully");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn put(&self, mut doc: Document) -> PersistenceResult<Uuid> {
        let id = doc.id().unwrap_or_else(Uuid::new_v4);
        doc.set_id(id);
        let body = serde_json::to_value(&doc)?;

        sqlx::query(
            "INSERT INTO documents (id, doc_type, body)
             VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET doc_type = EXCLUDED.doc_type, body = EXCLUDED.body, updated_at = NOW()",
        )
        .bind(id)
        .bind(doc.kind().as_str())
        .bind(Json(body))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> PersistenceResult<Document> {
        let body = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            "SELECT body FROM documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PersistenceError::NotFound(id))?;

        Ok(serde_json::from_value(body.0)?)
    }

    async fn del(&self, id: Uuid) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, kind: DocumentKind) -> PersistenceResult<Vec<Document>> {
        let rows = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            "SELECT body FROM documents WHERE doc_type = $1 ORDER BY seq DESC",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row.0).map_err(PersistenceError::from))
            .collect()
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
