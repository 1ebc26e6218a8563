use std::sync::Arc;
use tracing::debug;

use crate::{
    application::{frame::decode_frame, ports::DetectorPort},
    domain::{
        detection::{Detection, DetectionRequest, ResultBatch},
        errors::{DomainError, DomainResult},
        model::ConfidenceThreshold,
    },
};

/// Caso de uso de detección: decodifica el frame, llama al modelo y
/// convierte su salida nativa en una lista plana de `Detection`.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn DetectorPort>,
}

impl DetectionService {
    pub fn new(detector: Arc<dyn DetectorPort>) -> Self {
        Self { detector }
    }

    pub async fn detect(&self, request: DetectionRequest) -> DomainResult<Vec<Detection>> {
        let DetectionRequest { frame, threshold } = request;

        // La decodificación es CPU pura: fuera del runtime async
        let frame = tokio::task::spawn_blocking(move || decode_frame(&frame))
            .await
            .map_err(|e| DomainError::DecodeError(e.to_string()))??;

        debug!(width = frame.width, height = frame.height, threshold = threshold.value(), "frame decoded");

        let batches = self.detector.predict(frame, threshold).await?;
        shape_detections(batches, threshold, self.detector.class_names())
    }
}

/// Flattens the model's result stream, keeping emission order.
///
/// The threshold was already handed to the model as a pre-filter; it is
/// checked again here because the model's own filtering is not guaranteed to
/// be exact.
pub fn shape_detections(
    batches: Vec<ResultBatch>,
    threshold: ConfidenceThreshold,
    class_names: &[String],
) -> DomainResult<Vec<Detection>> {
    let mut detections = Vec::new();

    for batch in batches {
        for pred in batch {
            if !threshold.admits(pred.confidence) {
                continue;
            }

            let label = class_names.get(pred.class_id).ok_or_else(|| {
                DomainError::InferenceError(format!("unknown class id {}", pred.class_id))
            })?;

            let [x1, y1, x2, y2] = pred.xyxy;
            detections.push(Detection {
                x1: x1 as i32,
                y1: y1 as i32,
                x2: x2 as i32,
                y2: y2 as i32,
                label: label.clone(),
                confidence: pred.confidence,
            });
        }
    }

    Ok(detections)
}
