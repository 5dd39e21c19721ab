//! updown - File upload/download service
//!
//! Stores files either in a directory on the local filesystem or in a SQLite
//! database, and serves both through the same HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, UpdownError};
pub use file::{
    DatabaseBackend, DownloadLinks, DownloadedFile, FileSystemBackend, IncomingFile,
    StorageBackend, UploadResult,
};
pub use web::WebServer;
