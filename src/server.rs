use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::capture::CaptureEngine;
use crate::config::Settings;
use crate::error::ExportError;
use crate::preview::PreviewSurface;
use crate::record::DocumentRecord;

#[derive(Debug, Clone)]
pub struct AppState {
    settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        AppState { settings: Arc::new(settings) }
    }

    /// Records arrive from untrusted clients, so image sources are limited
    /// to data URLs and the configured allow-list.
    fn engine(&self) -> CaptureEngine {
        self.settings.capture_engine().with_image_policy(self.settings.image_policy())
    }

    fn surface(&self) -> PreviewSurface {
        PreviewSurface::new(self.engine())
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/documents/preview", post(preview))
        .route("/documents/pdf", post(render_pdf))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn preview(State(state): State<AppState>, Json(record): Json<DocumentRecord>) -> impl IntoResponse {
    let markup = state.surface().open(record);
    ([(header::CONTENT_TYPE, "application/json")], markup)
}

async fn render_pdf(
    State(state): State<AppState>,
    Json(record): Json<DocumentRecord>,
) -> Result<impl IntoResponse, ApiError> {
    let mut surface = state.surface();
    surface.open(record);
    let file = surface.export().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(file.filename())),
        ],
        file.bytes,
    ))
}

/// `attachment` with an ASCII fallback name and the exact UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    retryable: bool,
}

#[derive(Debug)]
pub struct ApiError(ExportError);

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retryable = self.0.is_retryable();
        let status = if retryable { StatusCode::INTERNAL_SERVER_ERROR } else { StatusCode::SERVICE_UNAVAILABLE };
        tracing::error!(error = %self.0, retryable, "pdf export failed");

        let body = ErrorBody { error: self.0.user_message(), retryable };
        (status, Json(body)).into_response()
    }
}
