//! Storage backend contract shared by the filesystem and database variants.

use async_trait::async_trait;
use axum::body::Bytes;
use serde::Serialize;

use super::name::{clean_path, is_valid_file_name};
use super::size::human_readable_byte_count_si;
use crate::{Result, UpdownError};

/// Content type used when the uploader declares none or probing fails.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A file received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Filename as sent by the client.
    pub original_name: String,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Payload.
    pub content: Bytes,
}

impl IncomingFile {
    /// Create a new IncomingFile.
    pub fn new(
        original_name: impl Into<String>,
        content_type: Option<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type,
            content: content.into(),
        }
    }

    /// The cleaned filename, checked against the grammar.
    pub fn validated_name(&self) -> Result<String> {
        let name = clean_path(&self.original_name);
        if !is_valid_file_name(&name) {
            return Err(UpdownError::Upload(format!("Invalid file name: {name}")));
        }
        Ok(name)
    }

    /// Declared content type, or `application/octet-stream`.
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(OCTET_STREAM)
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// File content returned by a download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Stored filename.
    pub file_name: String,
    /// MIME type (declared at upload, or probed).
    pub content_type: String,
    /// Payload.
    pub content: Vec<u8>,
}

/// Builds download URIs for one route group.
#[derive(Debug, Clone)]
pub struct DownloadLinks {
    base: String,
}

impl DownloadLinks {
    /// `origin` is e.g. `http://localhost:8080` (may be empty for relative
    /// URIs), `prefix` is the route group path.
    pub fn new(origin: &str, prefix: &str) -> Self {
        Self {
            base: format!("{}{}", origin.trim_end_matches('/'), prefix),
        }
    }

    /// Download URI for a stored file.
    pub fn uri_for(&self, file_name: &str) -> String {
        format!("{}/download/{}", self.base, urlencoding::encode(file_name))
    }
}

/// Response shape for an uploaded or listed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Stored filename.
    pub file_name: String,
    /// URI the file can be downloaded from.
    pub file_download_uri: String,
    /// MIME type.
    pub file_type: String,
    /// Exact size in bytes.
    pub file_size: u64,
    /// SI formatted size, e.g. "1.0 MB".
    pub file_size_readable: String,
}

impl UploadResult {
    /// Build a result, computing the download URI and readable size.
    pub fn new(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
        links: &DownloadLinks,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            file_download_uri: links.uri_for(&file_name),
            file_name,
            file_type: file_type.into(),
            file_size,
            file_size_readable: human_readable_byte_count_si(
                i64::try_from(file_size).unwrap_or(i64::MAX),
            ),
        }
    }
}

/// A storage medium serving the upload/download/list contract.
///
/// Names are validated by every implementation; callers pass client input
/// through unchanged.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    /// Store one file. Fails with `Upload` on invalid names and collisions.
    async fn upload(&self, file: IncomingFile, links: &DownloadLinks) -> Result<UploadResult>;

    /// Store several files. Either all are stored or none are.
    async fn upload_batch(
        &self,
        files: Vec<IncomingFile>,
        links: &DownloadLinks,
    ) -> Result<Vec<UploadResult>>;

    /// Fetch a stored file by name.
    async fn download(&self, file_name: &str) -> Result<DownloadedFile>;

    /// Describe every stored file.
    async fn list_all(&self, links: &DownloadLinks) -> Result<Vec<UploadResult>>;
}

/// Check a name taken from a download request.
pub(crate) fn validate_download_name(file_name: &str) -> Result<()> {
    if !is_valid_file_name(file_name) {
        return Err(UpdownError::Download(format!(
            "Invalid file name: {file_name}"
        )));
    }
    Ok(())
}
