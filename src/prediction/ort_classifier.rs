use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use serde::Deserialize;
use tokenizers::{PostProcessor, Tokenizer, TruncationParams};
use tracing::{debug, info};

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
#[cfg(feature = "cuda")]
use tracing::warn;

use super::classifier::{top_prediction, ClassifierError, TextClassifier};
use super::types::Prediction;
use crate::config::ModelConfig;

const DEFAULT_MAX_SEQ_LENGTH: usize = 512;

/// Sequence-classification transformer exported to ONNX
pub struct OrtTextClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    model_name: String,
}

#[derive(Debug, Deserialize)]
struct HubModelConfig {
    id2label: HashMap<String, String>,
}

impl OrtTextClassifier {
    /// Use local files when configured, otherwise fetch them from the Hugging Face Hub
    pub fn from_config(config: &ModelConfig) -> Result<Self, ClassifierError> {
        let classifier = match (&config.model_path, &config.tokenizer_path, &config.config_path) {
            (Some(model), Some(tokenizer), Some(labels)) => Self::from_paths(
                PathBuf::from(model),
                PathBuf::from(tokenizer),
                PathBuf::from(labels),
                &config.model_id,
            )?,
            _ => Self::from_hub(config)?,
        };
        classifier.with_max_sequence_length(config.max_sequence_length)
    }

    fn from_hub(config: &ModelConfig) -> Result<Self, ClassifierError> {
        info!("Fetching classifier {} from the Hugging Face Hub", config.model_id);

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| ClassifierError::Load(format!("Failed to create HF API: {}", e)))?;
        let repo = api.model(config.model_id.clone());

        let fetch = |local: &Option<String>, remote: &str| -> Result<PathBuf, ClassifierError> {
            match local {
                Some(path) => Ok(PathBuf::from(path)),
                None => repo.get(remote).map_err(|e| {
                    ClassifierError::Load(format!("Failed to download {}: {}", remote, e))
                }),
            }
        };

        let tokenizer_path = fetch(&config.tokenizer_path, "tokenizer.json")?;
        let config_path = fetch(&config.config_path, "config.json")?;
        let model_path = match &config.model_path {
            Some(path) => PathBuf::from(path),
            None => repo
                .get("model.onnx")
                .or_else(|_| repo.get("onnx/model.onnx"))
                .map_err(|e| {
                    ClassifierError::Load(format!(
                        "No ONNX export found for {}; export it with `optimum-cli export onnx --model {} --task text-classification <dir>` and set MODEL_PATH, TOKENIZER_PATH and MODEL_CONFIG_PATH: {}",
                        config.model_id, config.model_id, e
                    ))
                })?,
        };

        Self::from_paths(model_path, tokenizer_path, config_path, &config.model_id)
    }

    pub fn from_paths(
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        config_path: PathBuf,
        model_name: &str,
    ) -> Result<Self, ClassifierError> {
        info!("Loading ONNX model from: {:?}", model_path);

        let session = Self::create_session(&model_path)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ClassifierError::Load(format!("Failed to load tokenizer: {}", e)))?;
        set_truncation(&mut tokenizer, DEFAULT_MAX_SEQ_LENGTH)?;

        let config_json = std::fs::read_to_string(&config_path).map_err(|e| {
            ClassifierError::Load(format!("Failed to read {:?}: {}", config_path, e))
        })?;
        let labels = parse_labels(&config_json)?;
        info!("Classifier labels: {:?}", labels);

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            model_name: model_name.to_string(),
        })
    }

    /// Longer inputs are cut down to `max_sequence_length` tokens, special tokens included
    pub fn with_max_sequence_length(
        mut self,
        max_sequence_length: usize,
    ) -> Result<Self, ClassifierError> {
        set_truncation(&mut self.tokenizer, max_sequence_length)?;
        Ok(self)
    }

    fn create_session(model_path: &Path) -> Result<Session, ClassifierError> {
        let builder = Session::builder().map_err(|e| {
            ClassifierError::Load(format!("Failed to create session builder: {}", e))
        })?;

        #[cfg(feature = "cuda")]
        let builder = {
            if CUDAExecutionProvider::is_available() {
                info!("CUDA execution provider available, enabling GPU inference");
            } else {
                warn!("CUDA execution provider not available, falling back to CPU");
            }
            builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| {
                    ClassifierError::Load(format!("Failed to set CUDA execution provider: {}", e))
                })?
        };

        #[cfg(not(feature = "cuda"))]
        info!("No GPU execution provider configured, using CPU");

        builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Load(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Load(format!("Failed to load ONNX model: {}", e)))
    }
}

impl TextClassifier for OrtTextClassifier {
    fn classify(&self, text: &str) -> Result<Vec<Prediction>, ClassifierError> {
        let (input_ids, attention_mask) = encode(&self.tokenizer, text)?;
        let len = input_ids.len();
        debug!("Classifying sequence of {} tokens", len);

        let shape = [1usize, len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids)).map_err(|e| {
            ClassifierError::Inference(format!("Failed to create input_ids tensor: {}", e))
        })?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask)).map_err(|e| {
            ClassifierError::Inference(format!("Failed to create attention_mask tensor: {}", e))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            ])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| ClassifierError::InvalidOutput("no output tensor found".to_string()))?;

        let (_, logits) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InvalidOutput(e.to_string()))?;

        Ok(vec![top_prediction(logits, &self.labels)?])
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn set_truncation(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), ClassifierError> {
    let special_tokens = tokenizer
        .get_post_processor()
        .map_or(0, |processor| processor.added_tokens(false));
    if max_length <= special_tokens {
        return Err(ClassifierError::Load(format!(
            "max sequence length {} leaves no room next to {} special tokens",
            max_length, special_tokens
        )));
    }

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| ClassifierError::Load(format!("Invalid truncation length {}: {}", max_length, e)))?;
    Ok(())
}

/// Token ids and attention mask with special tokens, truncated by the tokenizer
fn encode(tokenizer: &Tokenizer, text: &str) -> Result<(Vec<i64>, Vec<i64>), ClassifierError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;

    let input_ids = encoding.get_ids().iter().map(|&x| x as i64).collect();
    let attention_mask = encoding
        .get_attention_mask()
        .iter()
        .map(|&x| x as i64)
        .collect();
    Ok((input_ids, attention_mask))
}

/// Ordered label names from a transformers `config.json`
fn parse_labels(config_json: &str) -> Result<Vec<String>, ClassifierError> {
    let config: HubModelConfig = serde_json::from_str(config_json)
        .map_err(|e| ClassifierError::Load(format!("Invalid model config: {}", e)))?;

    let mut indexed = config
        .id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|i| (i, label))
                .map_err(|_| ClassifierError::Load(format!("Non-numeric label id: {}", id)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(i, _)| *i);

    if indexed.is_empty() || indexed.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
        return Err(ClassifierError::Load(
            "id2label must cover ids 0..n without gaps".to_string(),
        ));
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenizers::models::wordlevel::WordLevel;
    use tokenizers::pre_tokenizers::whitespace::Whitespace;
    use tokenizers::processors::roberta::RobertaProcessing;

    const BOS: i64 = 0;
    const EOS: i64 = 2;

    /// Word-level tokenizer wrapping sequences in `<s> ... </s>` like RoBERTa
    fn roberta_like_tokenizer() -> Tokenizer {
        let vocab = [("<s>", 0), ("<pad>", 1), ("</s>", 2), ("<unk>", 3), ("sad", 4), ("today", 5)];
        let model = WordLevel::builder()
            .vocab(
                vocab
                    .into_iter()
                    .map(|(token, id)| (token.to_string(), id))
                    .collect(),
            )
            .unk_token("<unk>".to_string())
            .build()
            .unwrap();

        let mut tokenizer = Tokenizer::new(model);
        tokenizer.with_pre_tokenizer(Some(Whitespace::default()));
        tokenizer.with_post_processor(Some(RobertaProcessing::new(
            ("</s>".to_string(), 2),
            ("<s>".to_string(), 0),
        )));
        tokenizer
    }

    #[test]
    fn short_input_keeps_every_token() {
        let mut tokenizer = roberta_like_tokenizer();
        set_truncation(&mut tokenizer, 8).unwrap();

        let (ids, mask) = encode(&tokenizer, "sad today").unwrap();

        assert_eq!(ids, vec![BOS, 4, 5, EOS]);
        assert_eq!(mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn long_input_is_truncated_but_keeps_end_token() {
        let mut tokenizer = roberta_like_tokenizer();
        set_truncation(&mut tokenizer, 6).unwrap();
        let text = vec!["sad"; 600].join(" ");

        let (ids, mask) = encode(&tokenizer, &text).unwrap();

        assert_eq!(ids.len(), 6);
        assert_eq!(mask.len(), 6);
        assert_eq!(ids.first(), Some(&BOS));
        assert_eq!(ids.last(), Some(&EOS));
        assert!(ids[1..5].iter().all(|&id| id == 4));
    }

    #[test]
    fn length_without_room_for_text_is_rejected() {
        let mut tokenizer = roberta_like_tokenizer();
        let err = set_truncation(&mut tokenizer, 2).unwrap_err();
        assert!(matches!(err, ClassifierError::Load(_)));
    }

    #[test]
    fn labels_are_ordered_by_id() {
        let labels = parse_labels(
            r#"{"architectures": ["RobertaForSequenceClassification"],
                "id2label": {"2": "severe", "0": "moderate", "1": "not depression"}}"#,
        )
        .unwrap();
        assert_eq!(labels, vec!["moderate", "not depression", "severe"]);
    }

    #[test]
    fn gaps_in_label_ids_are_rejected() {
        let err = parse_labels(r#"{"id2label": {"0": "a", "2": "c"}}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::Load(_)));
    }

    #[test]
    fn missing_id2label_is_rejected() {
        assert!(parse_labels(r#"{"model_type": "roberta"}"#).is_err());
    }

    #[test]
    #[ignore = "Requires model download"]
    fn classifies_with_pretrained_model() {
        let classifier = OrtTextClassifier::from_config(&ModelConfig::default())
            .expect("Failed to load classifier");
        let result = classifier.classify("I feel fine today").unwrap();
        assert_eq!(result.len(), 1);
        assert!((0.0..=1.0).contains(&result[0].score));
    }
}
