use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::ClassifierError;
use super::model::HoaxClassifier;

/// The pretrained checkpoints the reviewer can pick from, identified by their
/// upstream hub names.
pub const SUPPORTED_MODELS: [&str; 4] = [
    "cahya/bert-base-indonesian-522M",
    "indobenchmark/indobert-base-p2",
    "indolem/indobert-base-uncased",
    "mdhugol/indonesia-bert-sentiment-classification",
];

pub const DEFAULT_MODEL: &str = SUPPORTED_MODELS[0];

/// Maps model identifiers to local TorchScript + tokenizer artifacts and
/// caches loads for the lifetime of the process.
pub struct ModelRegistry {
    model_dir: PathBuf,
    loaded: Mutex<HashMap<String, Arc<HoaxClassifier>>>,
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn models(&self) -> Vec<String> {
        SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect()
    }

    pub fn is_supported(model_id: &str) -> bool {
        SUPPORTED_MODELS.contains(&model_id)
    }

    /// Hub identifiers contain a slash; artifacts live in one flat directory
    /// per model, e.g. `models/cahya__bert-base-indonesian-522M/model.pt`.
    pub fn artifact_dir(&self, model_id: &str) -> PathBuf {
        self.model_dir.join(model_id.replace('/', "__"))
    }

    pub fn load(&self, model_id: &str) -> Result<Arc<HoaxClassifier>, ClassifierError> {
        if !Self::is_supported(model_id) {
            return Err(ClassifierError::UnknownModel(model_id.to_string()));
        }

        if let Some(classifier) = self.loaded.lock().unwrap().get(model_id) {
            return Ok(Arc::clone(classifier));
        }

        let dir = self.artifact_dir(model_id);
        log::info!("loading model {} from {}", model_id, dir.display());
        let classifier = Arc::new(HoaxClassifier::load(
            &dir.join("model.pt"),
            &dir.join("tokenizer.json"),
        )?);

        self.loaded
            .lock()
            .unwrap()
            .insert(model_id.to_string(), Arc::clone(&classifier));
        Ok(classifier)
    }
}
