pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::services::blob_service::BlobService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::list_files,
        api::handlers::files::upload_files,
        api::handlers::files::delete_file,
        api::handlers::files::delete_all_files,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::FileRecord,
            api::handlers::files::UploadResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "PDF file storage endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub blob_service: Arc<BlobService>,
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.blob_service.rules().max_request_size;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/files",
            get(api::handlers::files::list_files)
                .post(api::handlers::files::upload_files)
                .delete(api::handlers::files::delete_file),
        )
        .route("/files/all", delete(api::handlers::files::delete_all_files))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
