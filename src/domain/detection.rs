use serde::{Deserialize, Serialize};

use super::model::ConfidenceThreshold;

/// Objeto detectado tal y como se devuelve al cliente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
    pub confidence: f32,
}

/// Raw box as emitted by the model, in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxPrediction {
    pub xyxy: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

impl BoxPrediction {
    pub fn area(&self) -> f32 {
        let [x1, y1, x2, y2] = self.xyxy;
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    pub fn iou(&self, other: &BoxPrediction) -> f32 {
        let ix1 = self.xyxy[0].max(other.xyxy[0]);
        let iy1 = self.xyxy[1].max(other.xyxy[1]);
        let ix2 = self.xyxy[2].min(other.xyxy[2]);
        let iy2 = self.xyxy[3].min(other.xyxy[3]);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// One step of the model's result stream.
pub type ResultBatch = Vec<BoxPrediction>;

/// Petición de detección: se construye por cada request y se descarta con la respuesta.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub frame: Vec<u8>,
    pub threshold: ConfidenceThreshold,
}
