use thiserror::Error;

use super::types::Prediction;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to load model: {0}")]
    Load(String),
    #[error("Tokenization failed: {0}")]
    Tokenization(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
}

/// Pretrained text classifier. Calls block, so async callers should use
/// `spawn_blocking`.
pub trait TextClassifier: Send + Sync {
    /// Classify `text` as-is. The list is ordered by descending score.
    fn classify(&self, text: &str) -> Result<Vec<Prediction>, ClassifierError>;

    fn model_name(&self) -> &str;
}

pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Arg-max label with its softmax probability, the shape a text-classification
/// pipeline returns by default
pub(crate) fn top_prediction(
    logits: &[f32],
    labels: &[String],
) -> Result<Prediction, ClassifierError> {
    if logits.len() != labels.len() {
        return Err(ClassifierError::InvalidOutput(format!(
            "{} logits for {} labels",
            logits.len(),
            labels.len()
        )));
    }

    let probs = softmax(logits);
    let (index, score) = probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| ClassifierError::InvalidOutput("empty logits".to_string()))?;

    Ok(Prediction::new(labels[index].clone(), f64::from(score)))
}
