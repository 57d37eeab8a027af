pub mod types;
pub mod classifier;
pub mod ort_classifier;
pub mod client;

pub use types::{Prediction, PredictionRequest, PredictionResponse};
pub use classifier::{ClassifierError, TextClassifier};
pub use ort_classifier::OrtTextClassifier;
pub use client::{PredictionClient, PredictionError, Predictor};
