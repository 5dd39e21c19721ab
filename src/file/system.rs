//! Filesystem storage backend.
//!
//! Files are stored flat in one root directory under their validated name:
//! ```text
//! {root}/
//! ├── report.pdf
//! ├── testing-one.txt
//! └── .upload-<uuid>.part   (in-flight upload, never listed)
//! ```
//!
//! Uploads are written to a staging file first and then hard-linked to the
//! final name. Linking fails when the name already exists, so a racing upload
//! of the same name cannot overwrite a published file, and readers never see
//! a partially written file.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::backend::{
    validate_download_name, DownloadLinks, DownloadedFile, IncomingFile, StorageBackend,
    UploadResult,
};
use crate::{Result, UpdownError};

/// Prefix of staging files. Starts with a dot, so it can never be a valid name.
const STAGING_PREFIX: &str = ".upload-";

/// Storage backend writing into a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemBackend {
    root: PathBuf,
}

impl FileSystemBackend {
    /// Create the backend, creating `upload_directory` (and parents) if needed.
    ///
    /// The directory is made absolute and normalized once here.
    pub fn new(upload_directory: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(upload_directory.as_ref())
            .map(|p| normalize(&p))
            .and_then(|root| std::fs::create_dir_all(&root).map(|()| root))
            .map_err(|e| {
                error!(
                    "Failed to create upload directory {:?}: {}",
                    upload_directory.as_ref(),
                    e
                );
                UpdownError::Internal("Fatal error while creating file upload directory".to_string())
            })?;

        Ok(Self { root })
    }

    /// The absolute storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_absent(&self, name: &str) -> Result<()> {
        match fs::try_exists(self.root.join(name)).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(already_exists(name)),
            Err(e) => {
                error!("Failed to check existence of {}: {}", name, e);
                Err(upload_failed(name))
            }
        }
    }

    /// Write every entry. If one fails, the entries already written are removed.
    async fn write_all(&self, entries: &[(&str, &[u8])]) -> Result<()> {
        for (i, (name, content)) in entries.iter().enumerate() {
            if let Err(e) = self.write_new(name, content).await {
                for (done, _) in &entries[..i] {
                    if let Err(remove_err) = fs::remove_file(self.root.join(done)).await {
                        warn!("Failed to roll back {}: {}", done, remove_err);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Write `content` under `name` without ever replacing an existing file.
    async fn write_new(&self, name: &str, content: &[u8]) -> Result<()> {
        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{}.part", Uuid::new_v4()));

        if let Err(e) = fs::write(&staging, content).await {
            error!("Failed to write staging file for {}: {}", name, e);
            let _ = fs::remove_file(&staging).await;
            return Err(upload_failed(name));
        }

        let published = fs::hard_link(&staging, self.root.join(name)).await;
        if let Err(e) = fs::remove_file(&staging).await {
            warn!("Failed to remove staging file {:?}: {}", staging, e);
        }

        match published {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(already_exists(name)),
            Err(e) => {
                error!("Failed to publish {}: {}", name, e);
                Err(upload_failed(name))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    async fn upload(&self, file: IncomingFile, links: &DownloadLinks) -> Result<UploadResult> {
        let name = file.validated_name()?;
        self.ensure_absent(&name).await?;
        self.write_new(&name, &file.content).await?;

        info!(file_name = %name, size = file.size(), "Stored file on disk");
        Ok(UploadResult::new(
            name,
            file.content_type(),
            file.size(),
            links,
        ))
    }

    async fn upload_batch(
        &self,
        files: Vec<IncomingFile>,
        links: &DownloadLinks,
    ) -> Result<Vec<UploadResult>> {
        // Every name is checked before anything is written.
        let mut names = Vec::with_capacity(files.len());
        let mut seen = HashSet::new();
        for file in &files {
            let name = file.validated_name()?;
            if !seen.insert(name.clone()) {
                return Err(UpdownError::Upload(format!(
                    "Duplicate file name in upload: {name}"
                )));
            }
            self.ensure_absent(&name).await?;
            names.push(name);
        }

        let entries: Vec<(&str, &[u8])> = names
            .iter()
            .map(String::as_str)
            .zip(files.iter().map(|f| &f.content[..]))
            .collect();
        self.write_all(&entries).await?;

        info!(count = names.len(), "Stored file batch on disk");
        Ok(files
            .iter()
            .zip(names)
            .map(|(file, name)| UploadResult::new(name, file.content_type(), file.size(), links))
            .collect())
    }

    async fn download(&self, file_name: &str) -> Result<DownloadedFile> {
        validate_download_name(file_name)?;
        let path = self.root.join(file_name);

        let not_found = || UpdownError::NotFound(format!("File not found: {file_name}"));
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                error!("Failed to stat {}: {}", file_name, e);
                return Err(download_failed(file_name));
            }
        }

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                error!("Failed to read {}: {}", file_name, e);
                return Err(download_failed(file_name));
            }
        };

        debug!(file_name, size = content.len(), "Read file from disk");
        Ok(DownloadedFile {
            file_name: file_name.to_string(),
            content_type: probe_content_type(file_name),
            content,
        })
    }

    async fn list_all(&self, links: &DownloadLinks) -> Result<Vec<UploadResult>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(listing_failed)?;

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(listing_failed)? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with(STAGING_PREFIX) {
                continue;
            }

            let metadata = entry.metadata().await.map_err(listing_failed)?;
            if !metadata.is_file() {
                continue;
            }

            let file_type = probe_content_type(&file_name);
            results.push(UploadResult::new(file_name, file_type, metadata.len(), links));
        }

        results.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(results)
    }
}

/// Lexically resolve `.` and `..` in an absolute path.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn probe_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

fn already_exists(name: &str) -> UpdownError {
    UpdownError::Upload(format!("File already exists: {name}"))
}

fn upload_failed(name: &str) -> UpdownError {
    UpdownError::Internal(format!("Fatal error. Could not upload file: {name}"))
}

fn download_failed(name: &str) -> UpdownError {
    UpdownError::Internal(format!("Fatal error. Could not download file: {name}"))
}

fn listing_failed(e: io::Error) -> UpdownError {
    error!("Failed to list upload directory: {}", e);
    UpdownError::Internal("Fatal error. Could not list all files".to_string())
}
