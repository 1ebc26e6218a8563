use async_trait::async_trait;
use crate::domain::{
    detection::ResultBatch,
    errors::DomainResult,
    frame::BgrFrame,
    model::{ConfidenceThreshold, ModelId},
};

/// Modelo de detección, tratado como una función de puntuación opaca.
#[async_trait]
pub trait DetectorPort: Send + Sync {
    /// Class-name table, indexed by class id.
    fn class_names(&self) -> &[String];

    /// Runs the model with `threshold` as pre-filter and returns its result stream.
    async fn predict(&self, frame: BgrFrame, threshold: ConfidenceThreshold) -> DomainResult<Vec<ResultBatch>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
