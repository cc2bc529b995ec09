use std::path::Path;
use std::sync::Mutex;

use shared::Label;
use tch::{CModule, Device, Kind, Tensor};
use tokenizers::Tokenizer;

use super::{ClassifierError, Predictor};

/// BERT input limit; longer articles are truncated, not rejected.
const MAX_SEQ_LEN: usize = 512;

/// A TorchScript export of one of the pretrained hoax classifiers plus its
/// HuggingFace tokenizer. The module takes (input_ids, attention_mask,
/// token_type_ids) and returns two logits; index 1 is the HOAX class.
#[derive(Debug)]
pub struct HoaxClassifier {
    module: Mutex<CModule>,
    tokenizer: Tokenizer,
    device: Device,
}

impl HoaxClassifier {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ArtifactMissing(
                model_path.display().to_string(),
            ));
        }
        if !tokenizer_path.exists() {
            return Err(ClassifierError::ArtifactMissing(
                tokenizer_path.display().to_string(),
            ));
        }

        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(model_path, device)?;
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        Ok(Self {
            module: Mutex::new(module),
            tokenizer,
            device,
        })
    }

    /// Classify one news item. Title and content are encoded as a sentence
    /// pair, the way the models were fine-tuned.
    pub fn predict_label(&self, title: &str, content: &str) -> Result<Label, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode((title, content), true)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;

        let len = encoding.get_ids().len().min(MAX_SEQ_LEN);
        let ids: Vec<i64> = encoding.get_ids()[..len].iter().map(|&v| v as i64).collect();
        let type_ids: Vec<i64> = encoding.get_type_ids()[..len]
            .iter()
            .map(|&v| v as i64)
            .collect();
        let mask: Vec<i64> = encoding.get_attention_mask()[..len]
            .iter()
            .map(|&v| v as i64)
            .collect();

        let probs = self.forward(&ids, &mask, &type_ids)?;
        if probs.len() != 2 {
            return Err(ClassifierError::BadOutput(format!(
                "expected 2 class probabilities, got {}",
                probs.len()
            )));
        }

        Ok(if probs[1] >= probs[0] {
            Label::Hoax
        } else {
            Label::NonHoax
        })
    }

    fn forward(
        &self,
        ids: &[i64],
        mask: &[i64],
        type_ids: &[i64],
    ) -> Result<Vec<f32>, ClassifierError> {
        let input_ids = Tensor::from_slice(ids).view([1, -1]).to_device(self.device);
        let attention_mask = Tensor::from_slice(mask).view([1, -1]).to_device(self.device);
        let token_type_ids = Tensor::from_slice(type_ids)
            .view([1, -1])
            .to_device(self.device);

        let output = self
            .module
            .lock()
            .unwrap()
            .forward_ts(&[input_ids, attention_mask, token_type_ids])?;

        let probs = output.softmax(-1, Kind::Float).view([-1]);
        let num_elements = probs.size()[0] as usize;
        let mut out = vec![0.0f32; num_elements];
        probs.copy_data(&mut out, num_elements);
        Ok(out)
    }
}

impl Predictor for HoaxClassifier {
    fn predict(&self, title: &str, content: &str) -> Result<Label, ClassifierError> {
        self.predict_label(title, content)
    }
}
