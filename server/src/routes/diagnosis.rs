//! Leaf image classification endpoint

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, info};

use crop_diagnosis::Diagnosis;

use crate::error::ApiError;
use crate::state::SharedState;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// POST /api/crop-diagnosis - Diagnose an uploaded leaf image
pub async fn crop_diagnosis(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Diagnosis>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Not a multipart body: {}", rejection.body_text());
        ApiError::MissingImage
    })?;

    let bytes = read_image_field(&mut multipart)
        .await?
        .ok_or(ApiError::MissingImage)?;
    debug!("Received image upload: {} bytes", bytes.len());

    let service = state.service.clone();
    let diagnosis = tokio::task::spawn_blocking(move || service.diagnose_bytes(&bytes)).await??;

    info!(
        "Diagnosis: {} / {} ({:.4})",
        diagnosis.crop, diagnosis.disease, diagnosis.confidence
    );
    Ok(Json(diagnosis))
}

/// Bytes of the first `image` field, if any
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<Bytes>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            return Ok(Some(bytes));
        }
    }

    Ok(None)
}
