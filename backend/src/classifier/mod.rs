pub mod model;
pub mod registry;

use shared::Label;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("model artifact missing: {0}")]
    ArtifactMissing(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("inference error: {0}")]
    Inference(#[from] tch::TchError),
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

/// Detection seam used by the request handlers, so session and batch logic
/// can be exercised without a libtorch artifact on disk.
pub trait Predictor: Send + Sync {
    fn predict(&self, title: &str, content: &str) -> Result<Label, ClassifierError>;
}
