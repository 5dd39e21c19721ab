//! Database storage backend.
//!
//! File content lives in the `stored_files` table as a BLOB. Name uniqueness
//! is enforced by the table's `UNIQUE` constraint, so concurrent uploads of the
//! same name cannot both succeed.
//!
//! Writes run in `BEGIN IMMEDIATE` transactions. A second writer waits for the
//! first to commit and then sees its row in the existence check, so a racing
//! upload is reported as a collision rather than a locked database.

use async_trait::async_trait;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{
    validate_download_name, DownloadLinks, DownloadedFile, IncomingFile, StorageBackend,
    UploadResult,
};
use crate::db::Database;
use crate::{Result, UpdownError};

/// A row of the `stored_files` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredFile {
    /// Generated UUID.
    pub id: String,
    /// Unique filename.
    pub file_name: String,
    /// MIME type declared at upload.
    pub file_type: String,
    /// Payload size in bytes.
    pub file_byte_size: i64,
    /// Payload.
    pub binary_data: Vec<u8>,
    /// Insertion timestamp.
    pub created_at: String,
}

/// Metadata of a stored file, without its payload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredFileSummary {
    /// Unique filename.
    pub file_name: String,
    /// MIME type declared at upload.
    pub file_type: String,
    /// Payload size in bytes.
    pub file_byte_size: i64,
}

/// Data for inserting a new stored file.
#[derive(Debug, Clone)]
pub struct NewStoredFile<'a> {
    /// Unique filename (already validated).
    pub file_name: &'a str,
    /// MIME type.
    pub file_type: &'a str,
    /// Payload.
    pub binary_data: &'a [u8],
}

/// Queries on `stored_files`.
///
/// Every method takes a connection so callers can run several of them inside
/// one transaction.
pub struct StoredFileRepository;

impl StoredFileRepository {
    /// Insert a file and return its generated id.
    ///
    /// A unique-constraint violation on the name is reported as an upload
    /// collision.
    pub async fn create(conn: &mut SqliteConnection, file: &NewStoredFile<'_>) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO stored_files (id, file_name, file_type, file_byte_size, binary_data)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(file.file_name)
        .bind(file.file_type)
        .bind(file.binary_data.len() as i64)
        .bind(file.binary_data)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                UpdownError::Upload(format!("File already exists: {}", file.file_name))
            }
            other => other.into(),
        })?;

        Ok(id)
    }

    /// Check whether a file with this name is stored.
    pub async fn exists_by_file_name(conn: &mut SqliteConnection, file_name: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stored_files WHERE file_name = ?)")
                .bind(file_name)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists)
    }

    /// Get a file, including its payload, by name.
    pub async fn find_by_file_name(
        conn: &mut SqliteConnection,
        file_name: &str,
    ) -> Result<Option<StoredFile>> {
        let file = sqlx::query_as::<_, StoredFile>(
            "SELECT id, file_name, file_type, file_byte_size, binary_data, created_at
             FROM stored_files WHERE file_name = ?",
        )
        .bind(file_name)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(file)
    }

    /// List metadata of all files in insertion order.
    pub async fn list_summaries(conn: &mut SqliteConnection) -> Result<Vec<StoredFileSummary>> {
        let files = sqlx::query_as::<_, StoredFileSummary>(
            "SELECT file_name, file_type, file_byte_size FROM stored_files ORDER BY rowid",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(files)
    }
}

/// Storage backend keeping files in the database.
#[derive(Debug, Clone)]
pub struct DatabaseBackend {
    db: Database,
}

impl DatabaseBackend {
    /// Create a backend on top of an opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Start a transaction holding the write lock from its first statement.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.db.pool().begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn store(
        conn: &mut SqliteConnection,
        file: &IncomingFile,
        links: &DownloadLinks,
    ) -> Result<UploadResult> {
        let name = file.validated_name()?;

        if StoredFileRepository::exists_by_file_name(conn, &name).await? {
            return Err(UpdownError::Upload(format!("File already exists: {name}")));
        }

        let new_file = NewStoredFile {
            file_name: &name,
            file_type: file.content_type(),
            binary_data: &file.content,
        };
        StoredFileRepository::create(conn, &new_file).await?;

        Ok(UploadResult::new(
            name.as_str(),
            file.content_type(),
            file.size(),
            links,
        ))
    }
}

#[async_trait]
impl StorageBackend for DatabaseBackend {
    fn kind(&self) -> &'static str {
        "database"
    }

    async fn upload(&self, file: IncomingFile, links: &DownloadLinks) -> Result<UploadResult> {
        let mut tx = self.begin_write().await?;
        let result = Self::store(&mut tx, &file, links).await?;
        tx.commit().await?;

        info!(file_name = %result.file_name, size = result.file_size, "Stored file in database");
        Ok(result)
    }

    async fn upload_batch(
        &self,
        files: Vec<IncomingFile>,
        links: &DownloadLinks,
    ) -> Result<Vec<UploadResult>> {
        let mut tx = self.begin_write().await?;

        let mut results = Vec::with_capacity(files.len());
        for file in &files {
            match Self::store(&mut tx, file, links).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("Failed to roll back upload batch: {}", rollback_err);
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;

        info!(count = results.len(), "Stored file batch in database");
        Ok(results)
    }

    async fn download(&self, file_name: &str) -> Result<DownloadedFile> {
        validate_download_name(file_name)?;

        let mut tx = self.db.pool().begin().await?;
        let stored = StoredFileRepository::find_by_file_name(&mut tx, file_name).await?;
        tx.commit().await?;

        let stored =
            stored.ok_or_else(|| UpdownError::NotFound(format!("File not found: {file_name}")))?;

        debug!(file_name, size = stored.file_byte_size, "Read file from database");
        Ok(DownloadedFile {
            file_name: stored.file_name,
            content_type: stored.file_type,
            content: stored.binary_data,
        })
    }

    async fn list_all(&self, links: &DownloadLinks) -> Result<Vec<UploadResult>> {
        let mut conn = self.db.pool().acquire().await?;
        let files = StoredFileRepository::list_summaries(&mut conn).await?;

        Ok(files
            .into_iter()
            .map(|f| {
                UploadResult::new(
                    f.file_name,
                    f.file_type,
                    u64::try_from(f.file_byte_size).unwrap_or(0),
                    links,
                )
            })
            .collect())
    }
}
