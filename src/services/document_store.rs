//! src/services/document_store.rs
//!
//! DocumentStore: durable CRUD over `NoteDocument` records backed by a
//! single SQLite table. Payloads live inline in the table; there is no
//! on-disk object tree and no cache in front of it.

use crate::models::note::NoteDocument;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};

/// Number of documents returned by `list_recent` when the caller has no preference.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage at `{location}` is unavailable: {source}")]
    StorageUnavailable {
        location: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("transaction failed: {0}")]
    Transaction(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the open note collection.
///
/// Cloning is cheap; every clone shares one connection pool, so the
/// database is opened exactly once per `open` call no matter how many
/// callers hold the handle.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    db: Arc<SqlitePool>,
}

impl DocumentStore {
    /// Open (creating if needed) the database at `database_url` and apply
    /// the schema.
    ///
    /// Any failure here is reported as `StorageUnavailable`.
    pub async fn open(database_url: &str) -> StoreResult<Self> {
        let unavailable = |source: sqlx::Error| StoreError::StorageUnavailable {
            location: database_url.to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(unavailable)?
            .create_if_missing(true);

        let db_path = options.get_filename().to_path_buf();
        debug!("Interpreted SQLite path => {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            ensure_dir(parent).await.map_err(unavailable)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        apply_schema(&pool).await.map_err(unavailable)?;
        info!("Opened note store at {}", db_path.display());

        Ok(Self { db: Arc::new(pool) })
    }

    /// Insert `doc`, or replace the stored record with the same id.
    pub async fn upsert(&self, doc: &NoteDocument) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO notes (id, created_at, description, mime_type, blob)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                created_at = excluded.created_at,
                description = excluded.description,
                mime_type = excluded.mime_type,
                blob = excluded.blob
            "#,
        )
        .bind(&doc.id)
        .bind(doc.created_at)
        .bind(&doc.description)
        .bind(&doc.mime_type)
        .bind(doc.blob.as_slice())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("upserted note {}", doc.id);
        Ok(())
    }

    /// Remove the record with `id`. Unknown ids are not an error.
    pub async fn delete_by_id(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            debug!("note {} already absent", id);
        } else {
            debug!("deleted note {}", id);
        }
        Ok(())
    }

    /// Fetch a single record; `None` when no record has that id.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<NoteDocument>> {
        let doc = sqlx::query_as::<_, NoteDocument>(
            "SELECT id, created_at, description, mime_type, blob FROM notes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(doc)
    }

    /// Every stored record, in no particular order.
    pub async fn list_all(&self) -> StoreResult<Vec<NoteDocument>> {
        let docs = sqlx::query_as::<_, NoteDocument>(
            "SELECT id, created_at, description, mime_type, blob FROM notes",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(docs)
    }

    /// Up to `limit` records, newest first.
    #[allow(dead_code)]
    pub async fn list_recent(&self, limit: usize) -> StoreResult<Vec<NoteDocument>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let docs = sqlx::query_as::<_, NoteDocument>(
            "SELECT id, created_at, description, mime_type, blob FROM notes
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&*self.db)
        .await?;
        Ok(docs)
    }

    /// Cheap connectivity check for readiness probes.
    pub async fn ping(&self) -> StoreResult<i64> {
        let value = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(value)
    }

    /// Close the pool. Operations issued afterwards fail.
    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Create `dir` if it is missing. An empty path means the working directory.
async fn ensure_dir(dir: &Path) -> Result<(), sqlx::Error> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir).await?;
    info!("Created missing directory {:?}", dir);
    Ok(())
}

/// Run each statement of the embedded schema.
async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in statements {
        debug!("Executing schema SQL: {}", stmt);
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
