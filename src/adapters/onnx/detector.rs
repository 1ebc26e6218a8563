use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::ResultBatch,
    errors::{DomainError, DomainResult},
    frame::BgrFrame,
    model::{ConfidenceThreshold, ModelId, YoloParams},
};

/// Adaptador del modelo ONNX. La sesión se carga una sola vez al arrancar y
/// se comparte entre peticiones; `Session::run` exige acceso exclusivo, así
/// que toda inferencia pasa en serie por el mutex.
pub struct OnnxDetector {
    engine: Arc<Mutex<OnnxYoloEngine>>,
    names: Vec<String>,
    params: YoloParams,
}

impl OnnxDetector {
    pub fn load(model: &ModelId, params: YoloParams) -> anyhow::Result<Self> {
        info!("Loading model from: {}", model.onnx_path);
        let engine = OnnxYoloEngine::load(&model.onnx_path, &params)?;
        let names = engine.class_names().to_vec();

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            names,
            params,
        })
    }
}

#[async_trait]
impl DetectorPort for OnnxDetector {
    fn class_names(&self) -> &[String] {
        &self.names
    }

    async fn predict(&self, frame: BgrFrame, threshold: ConfidenceThreshold) -> DomainResult<Vec<ResultBatch>> {
        let engine = self.engine.clone();
        let params = YoloParams {
            conf_threshold: threshold.value(),
            ..self.params.clone()
        };

        tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| DomainError::InferenceError("model lock poisoned".into()))?;
            engine
                .infer(&frame, &params)
                .map(|boxes| vec![boxes])
                .map_err(|e| DomainError::InferenceError(format!("{:#}", e)))
        })
        .await
        .map_err(|e| DomainError::InferenceError(e.to_string()))?
    }
}
