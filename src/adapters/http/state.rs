use std::sync::Arc;
use crate::application::services::DetectionService;

/// Estado compartido para los manejadores HTTP de Axum.
/// El modelo vive dentro del servicio y no se modifica tras el arranque.
#[derive(Clone)]
pub struct HttpState {
    /// Caso de uso de detección (decodificación + inferencia).
    pub detection: Arc<DetectionService>,
    /// Tamaño máximo del cuerpo multipart aceptado en /detect.
    pub max_upload_bytes: usize,
}
