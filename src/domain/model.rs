use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "best"
    pub onnx_path: String,  // filesystem path
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // overridden by the model's `imgsz` metadata
    pub conf_threshold: f32,    // 0..1, replaced per request
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Minimum score (0..1) a detection must reach to be reported.
///
/// Clients send it on a 0..100 scale; values outside that range are not
/// clamped. `nan` and `inf` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub const DEFAULT_PERCENT: f32 = 75.0;

    pub fn from_percent(percent: f32) -> Self {
        Self(percent / 100.0)
    }

    /// Parses the optional `confidence_threshold` form value.
    pub fn parse_percent(raw: Option<&str>) -> DomainResult<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let percent = raw.trim().parse::<f32>().map_err(|e| {
            DomainError::InvalidInput(format!(
                "could not convert confidence_threshold '{}' to float: {}",
                raw, e
            ))
        })?;
        if !percent.is_finite() {
            return Err(DomainError::InvalidInput(format!(
                "confidence_threshold must be a finite number, got '{}'",
                raw
            )));
        }
        Ok(Self::from_percent(percent))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn admits(self, confidence: f32) -> bool {
        confidence >= self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self::from_percent(Self::DEFAULT_PERCENT)
    }
}
