//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    backend_unavailable, download_file, list_files, upload_file, upload_files, FileRoutesState,
};
use crate::config::Config;
use crate::file::{DatabaseBackend, FileSystemBackend, StorageBackend};

/// Route prefix of the filesystem backend.
pub const IN_SYSTEM_PREFIX: &str = "/api/v1/in-system/files";

/// Route prefix of the database backend.
pub const IN_DATABASE_PREFIX: &str = "/api/v1/in-database/files";

/// Create the main API router.
///
/// Without a filesystem backend the in-system group still exists but answers
/// every request with an internal error.
pub fn create_router(
    file_system: Option<FileSystemBackend>,
    database: DatabaseBackend,
    config: &Config,
) -> Router {
    let public_url = config.server.public_url.clone();

    let system_routes = match file_system {
        Some(backend) => file_routes(backend, IN_SYSTEM_PREFIX, public_url.clone()),
        None => unavailable_routes(IN_SYSTEM_PREFIX),
    };
    let database_routes = file_routes(database, IN_DATABASE_PREFIX, public_url);

    Router::new()
        .merge(system_routes)
        .merge(database_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(config.files.max_upload_size_bytes())),
        )
}

/// Upload, download and list routes of one backend.
fn file_routes<B: StorageBackend>(
    backend: B,
    prefix: &'static str,
    public_url: Option<String>,
) -> Router {
    tracing::debug!("Mounting {} file routes at {}", backend.kind(), prefix);
    let state = Arc::new(FileRoutesState::new(backend, prefix, public_url));

    Router::new()
        .route(prefix, get(list_files::<B>))
        .route(&format!("{prefix}/upload"), post(upload_file::<B>))
        .route(&format!("{prefix}/uploads"), post(upload_files::<B>))
        .route(
            &format!("{prefix}/download/:file_name"),
            get(download_file::<B>),
        )
        .with_state(state)
}

fn unavailable_routes(prefix: &'static str) -> Router {
    Router::new()
        .route(prefix, any(backend_unavailable))
        .route(&format!("{prefix}/*rest"), any(backend_unavailable))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::db::Database;

    async fn database_backend() -> DatabaseBackend {
        DatabaseBackend::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = create_health_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unavailable_file_system_group() {
        let router = create_router(None, database_backend().await, &Config::default());

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/in-system/files")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/in-system/files/upload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = router
            .oneshot(
                Request::get("/api/v1/in-database/files")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
