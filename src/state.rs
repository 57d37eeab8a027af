use std::sync::Arc;

use crate::prediction::TextClassifier;

/// Shared state of the prediction server
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn TextClassifier>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }
}
