use async_trait::async_trait;

/// Outcome of one translation call. Callers must check `success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
    pub detected_language: String,
    pub success: bool,
}

impl TranslationResult {
    pub fn ok(translated_text: impl Into<String>, detected_language: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            detected_language: detected_language.into(),
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            translated_text: String::new(),
            detected_language: String::new(),
            success: false,
        }
    }
}

/// Text translation backend.
///
/// Implementations never return an error: every failure is reported through
/// [`TranslationResult::failed`] (or `None` for detection).
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> TranslationResult;

    async fn detect_language(&self, text: &str) -> Option<String>;
}
