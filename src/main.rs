use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yolo_detect_server::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{detector::OnnxDetector, model_catalog::OnnxModelCatalog},
    },
    application::{ports::ModelCatalogPort, services::DetectionService},
    config::ServerConfig,
    domain::model::{ModelId, YoloParams},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Configuración (variables de entorno sobre los valores por defecto)
    let config = ServerConfig::from_env()?;

    // 3. Validar y cargar el modelo una sola vez. Si falla, el proceso no arranca.
    let model = ModelId {
        name: "best".to_string(),
        onnx_path: config.model_path.clone(),
    };
    OnnxModelCatalog::new().validate_model(&model).await?;
    let detector = Arc::new(OnnxDetector::load(&model, YoloParams::default())?);

    // 4. Caso de uso y estado de la API
    let state = HttpState {
        detection: Arc::new(DetectionService::new(detector)),
        max_upload_bytes: config.max_upload_bytes,
    };
    let app = router(state);

    // 5. Lanzar el servidor
    let addr = config.bind_addr();
    tracing::info!("🚀 Detection server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
