use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, warn};

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{DetectionsResponse, HealthResponse};
use crate::domain::{
    detection::DetectionRequest,
    errors::{DomainError, DomainResult},
    model::ConfidenceThreshold,
};

pub const FRAME_FIELD: &str = "frame";
pub const THRESHOLD_FIELD: &str = "confidence_threshold";
pub const NO_FRAME: &str = "No frame provided";

#[derive(Debug, Default)]
struct DetectForm {
    frame: Option<Vec<u8>>,
    confidence_threshold: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> DomainResult<DetectForm> {
    let mut form = DetectForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::InvalidInput(format!("multipart error: {}", e)))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            // Solo cuenta como frame una parte con filename; si hay varias, la primera
            Some(FRAME_FIELD) if field.file_name().is_some() && form.frame.is_none() => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| DomainError::InvalidInput(format!("failed to read frame: {}", e)))?;
                form.frame = Some(data.to_vec());
            }
            Some(THRESHOLD_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| DomainError::InvalidInput(format!("failed to read {}: {}", THRESHOLD_FIELD, e)))?;
                form.confidence_threshold = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /detect
pub async fn detect(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionsResponse>, ApiError> {
    // Sin cuerpo multipart no puede haber campo `frame`
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await?,
        Err(rejection) => {
            warn!("rejected multipart body: {}", rejection);
            DetectForm::default()
        }
    };

    let frame = form
        .frame
        .ok_or_else(|| DomainError::MissingInput(NO_FRAME.into()))?;
    let threshold = ConfidenceThreshold::parse_percent(form.confidence_threshold.as_deref())?;

    let detections = st
        .detection
        .detect(DetectionRequest { frame, threshold })
        .await?;

    debug!(count = detections.len(), "detections returned");
    Ok(Json(DetectionsResponse { detections }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::loaded())
}
