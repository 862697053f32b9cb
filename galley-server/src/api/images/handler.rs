//! Image API handlers
//!
//! Uploads arrive as multipart form data under a `file` field. Storage
//! itself (validation, compression, deduplication) lives behind the
//! [`ImageStorage`](crate::services::ImageStorage) gateway; handlers
//! only shuttle bytes in and out.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

use crate::core::ServerState;

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub original_name: String,
    pub size: usize,
    pub url: String,
}

/// Query for `PUT /images/update`
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// File name of the image being replaced
    pub existing: String,
}

/// Pull the `file` field out of a multipart request
async fn read_multipart_file(mut multipart: Multipart) -> AppResult<(Vec<u8>, String)> {
    let mut field_data: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::validation(format!("Invalid multipart request: {}", e))
    })? {
        let name = field.name().map(|s| s.to_string());
        if name.as_deref() == Some("file") || name.as_deref() == Some("") {
            original_name = field.file_name().map(|s| s.to_string());
            field_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {}", e)))?
                    .to_vec(),
            );
            break;
        }
    }

    let data = field_data.ok_or_else(|| {
        AppError::with_message(
            ErrorCode::NoFileProvided,
            "No 'file' field found. Field name must be 'file'",
        )
    })?;

    let original_name = original_name.ok_or_else(|| AppError::new(ErrorCode::NoFilename))?;

    Ok((data, original_name))
}

/// POST /images/upload
pub async fn upload(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let (data, original_name) = read_multipart_file(multipart).await?;

    let stored = state.image_storage.upload(&data, &original_name).await?;

    Ok(Json(UploadResponse {
        file_name: stored.file_name,
        original_name,
        size: stored.size,
        url: stored.url,
    }))
}

/// PUT /images/update?existing=...
pub async fn update(
    State(state): State<ServerState>,
    Query(query): Query<UpdateQuery>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let (data, original_name) = read_multipart_file(multipart).await?;

    let stored = state
        .image_storage
        .replace(&data, &original_name, &query.existing)
        .await?;

    Ok(Json(UploadResponse {
        file_name: stored.file_name,
        original_name,
        size: stored.size,
        url: stored.url,
    }))
}

/// DELETE /images/delete/{file_name}
pub async fn remove(
    State(state): State<ServerState>,
    Path(file_name): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.image_storage.delete(&file_name).await?;
    Ok(Json(ApiResponse::ok()))
}

/// GET /api/image/{file_name}
pub async fn serve(
    State(state): State<ServerState>,
    Path(file_name): Path<String>,
) -> AppResult<Response> {
    let data = state.image_storage.load(&file_name).await?;

    let mime = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, mime)], data).into_response())
}
