use crate::AppState;
use crate::api::error::AppError;
use crate::models::{FileRecord, UploadBatch, UploadPart};
use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// "FileName" or "FileSize"; anything else orders by name
    pub order_by: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// Location of the file as returned by the listing
    #[validate(length(min = 1, message = "fileUri must not be empty"))]
    pub file_uri: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub uploaded: usize,
    /// Generated storage names, in upload order
    pub file_names: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/files",
    params(ListQuery),
    responses(
        (status = 200, description = "Stored files", body = Vec<FileRecord>),
        (status = 503, description = "Storage unavailable")
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    let records = match query.order_by.as_deref() {
        Some(key) => state.blob_service.ordered_list(key).await?,
        None => state.blob_service.list().await?,
    };
    Ok(Json(records))
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = Multipart, description = "One or more PDF files"),
    responses(
        (status = 200, description = "Files uploaded", body = UploadResponse),
        (status = 400, description = "Validation failed or no file provided"),
        (status = 413, description = "Request body too large")
    ),
    tag = "files"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut batch = UploadBatch::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!("Ignoring non-file field {:?}", field.name());
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        batch.push(UploadPart::new(file_name, content_type.as_deref(), data));
    }

    if batch.is_empty() {
        return Err(AppError::BadRequest("No file provided".to_string()));
    }

    let failures = state.blob_service.validate(&batch);
    if !failures.is_empty() {
        warn!(
            "Rejected upload of {} files with {} validation failures",
            batch.len(),
            failures.len()
        );
        return Err(AppError::Validation(failures.into()));
    }

    let file_names = state.blob_service.upload(&batch).await?;

    Ok(Json(UploadResponse {
        uploaded: file_names.len(),
        file_names,
    }))
}

#[utoipa::path(
    delete,
    path = "/files",
    params(DeleteQuery),
    responses(
        (status = 204, description = "File deleted, or it did not exist"),
        (status = 400, description = "Malformed file URI")
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    query
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.blob_service.delete(&query.file_uri).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/files/all",
    responses(
        (status = 204, description = "All files deleted")
    ),
    tag = "files"
)]
pub async fn delete_all_files(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.blob_service.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
