//! File handlers for Web API.
//!
//! The handlers are generic over [`StorageBackend`] so both route groups share
//! one implementation.

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
        Multipart, OriginalUri, Path, State,
    },
    http::{header, HeaderMap, StatusCode, Uri},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{DownloadLinks, IncomingFile, StorageBackend, UploadResult};
use crate::web::error::{ApiError, ErrorKind};

/// Shared state of one route group.
pub struct FileRoutesState<B> {
    /// Storage backend serving the group.
    pub backend: B,
    /// Route prefix, e.g. `/api/v1/in-system/files`.
    pub prefix: &'static str,
    /// Configured public origin for download URIs.
    pub public_url: Option<String>,
}

impl<B> FileRoutesState<B> {
    /// Create a new state.
    pub fn new(backend: B, prefix: &'static str, public_url: Option<String>) -> Self {
        Self {
            backend,
            prefix,
            public_url,
        }
    }

    /// Download link builder for the current request.
    ///
    /// The origin is the configured public URL, else the request's `Host`
    /// header, else the request URI authority. Without any of them links are
    /// relative.
    pub fn links(&self, headers: &HeaderMap, uri: &Uri) -> DownloadLinks {
        let origin = match &self.public_url {
            Some(url) => url.clone(),
            None => headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(|host| format!("http://{host}"))
                .or_else(|| {
                    uri.authority().map(|authority| {
                        format!("{}://{}", uri.scheme_str().unwrap_or("http"), authority)
                    })
                })
                .unwrap_or_default(),
        };
        DownloadLinks::new(&origin, self.prefix)
    }
}

/// Collect every file sent under `field_name`, in request order.
async fn read_files(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Vec<IncomingFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_failure(e, None))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let content = field
            .bytes()
            .await
            .map_err(|e| multipart_failure(e, Some(&file_name)))?;

        files.push(IncomingFile::new(file_name, content_type, content));
    }

    Ok(files)
}

fn multipart_failure(e: MultipartError, file_name: Option<&str>) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(ErrorKind::PayloadTooLarge, "Maximum upload size exceeded");
    }

    tracing::error!("Failed to read multipart field: {}", e);
    match file_name {
        Some(name) => ApiError::upload(format!("Fatal error. Could not upload file: {name}")),
        None => ApiError::upload("Invalid multipart data"),
    }
}

/// POST {prefix}/upload - Store the file sent in the `file` part.
pub async fn upload_file<B: StorageBackend>(
    State(state): State<Arc<FileRoutesState<B>>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>, ApiError> {
    let path = uri.path();
    let mut multipart = multipart.map_err(|e| ApiError::upload(e.body_text()).with_path(path))?;

    let file = read_files(&mut multipart, "file")
        .await
        .map_err(|e| e.with_path(path))?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::upload("Required part 'file' is not present").with_path(path))?;

    let links = state.links(&headers, &uri);
    let result = state
        .backend
        .upload(file, &links)
        .await
        .map_err(|e| ApiError::from(e).with_path(path))?;

    Ok(Json(result))
}

/// POST {prefix}/uploads - Store every file sent in `files` parts, all or none.
pub async fn upload_files<B: StorageBackend>(
    State(state): State<Arc<FileRoutesState<B>>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<UploadResult>>, ApiError> {
    let path = uri.path();
    let mut multipart = multipart.map_err(|e| ApiError::upload(e.body_text()).with_path(path))?;

    let files = read_files(&mut multipart, "files")
        .await
        .map_err(|e| e.with_path(path))?;
    if files.is_empty() {
        return Err(ApiError::upload("Required part 'files' is not present").with_path(path));
    }

    let links = state.links(&headers, &uri);
    let results = state
        .backend
        .upload_batch(files, &links)
        .await
        .map_err(|e| ApiError::from(e).with_path(path))?;

    Ok(Json(results))
}

/// GET {prefix}/download/:file_name - Return the stored bytes as an attachment.
pub async fn download_file<B: StorageBackend>(
    State(state): State<Arc<FileRoutesState<B>>>,
    OriginalUri(uri): OriginalUri,
    file_name: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let path = uri.path();
    let Path(file_name) = file_name
        .map_err(|e| ApiError::new(ErrorKind::Download, e.body_text()).with_path(path))?;
    let file = state
        .backend
        .download(&file_name)
        .await
        .map_err(|e| ApiError::from(e).with_path(path))?;

    let content_length = file.content.len();
    Response::builder()
        .header(header::CONTENT_TYPE, file.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", file.file_name),
        )
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from(file.content))
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal(format!("Fatal error. Could not download file: {file_name}"))
                .with_path(path)
        })
}

/// GET {prefix} - Describe every stored file.
pub async fn list_files<B: StorageBackend>(
    State(state): State<Arc<FileRoutesState<B>>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Vec<UploadResult>>, ApiError> {
    let links = state.links(&headers, &uri);
    let files = state
        .backend
        .list_all(&links)
        .await
        .map_err(|e| ApiError::from(e).with_path(uri.path()))?;

    Ok(Json(files))
}

/// Handler for a route group whose backend failed to start.
pub async fn backend_unavailable(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::internal("Fatal error while creating file upload directory").with_path(uri.path())
}
