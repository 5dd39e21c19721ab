//! Database schema and migrations for updown.
//!
//! Migrations are applied in order when the database is opened. The
//! schema_version table records which ones have already run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: stored files
    r#"
CREATE TABLE stored_files (
    id              TEXT PRIMARY KEY,            -- UUID v4
    file_name       TEXT NOT NULL UNIQUE,
    file_type       TEXT NOT NULL,
    file_byte_size  INTEGER NOT NULL CHECK (file_byte_size >= 0),
    binary_data     BLOB NOT NULL,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_stored_files_created_at ON stored_files(created_at);
"#,
];
