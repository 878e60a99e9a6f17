//! PDF report endpoint

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::info;

use crop_diagnosis::report::{write_report, ReportRequest, REPORT_FILENAME};

use crate::error::ApiError;
use crate::state::SharedState;

/// POST /api/generate-report - Render a diagnosis as a PDF attachment
///
/// The file is written to the report directory first and then streamed
/// back; concurrent requests overwrite the same file.
pub async fn generate_report(
    State(state): State<SharedState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let dir = state.config.report_dir.clone();
    let path = tokio::task::spawn_blocking(move || write_report(&request, &dir)).await??;
    info!("Report written to {:?}", path);

    let file = fs::File::open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to open report: {}", e)))?;

    // Stream the file
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let content_disposition = format!("attachment; filename=\"{}\"", REPORT_FILENAME);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        body,
    ))
}
