//! File storage for updown.
//!
//! This module provides the two storage media behind the HTTP API:
//! - A directory on the local filesystem
//! - The `stored_files` table of the SQLite database
//!
//! Both implement [`StorageBackend`] and share filename validation and the
//! [`UploadResult`] response shape.

mod backend;
mod database;
mod name;
mod size;
mod system;

pub use backend::{
    DownloadLinks, DownloadedFile, IncomingFile, StorageBackend, UploadResult, OCTET_STREAM,
};
pub use database::{
    DatabaseBackend, NewStoredFile, StoredFile, StoredFileRepository, StoredFileSummary,
};
pub use name::{clean_path, is_valid_file_name};
pub use size::human_readable_byte_count_si;
pub use system::FileSystemBackend;
