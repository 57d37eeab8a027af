use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::formatting::{format_model_results, FormatError};
use super::telegram::Message;
use crate::prediction::Predictor;
use crate::translate::Translator;

pub const WELCOME_TEXT: &str = "Привет! Отправь мне текст, и я обработаю его с помощью нейронной модели.\n\
Результатом работы будет предполагаемая оценка наличия депрессии (отсутствует, умеренная, сильная).\n\
Важно! Этот бот не ставит диагноз, если вы заподозрили у себя любые симптомы - необходимо обратиться ко врачу!";

pub const RESULT_HEADER: &str = "Результат обработки:\n\n";
pub const PROCESSING_ERROR_TEXT: &str = "Произошла ошибка при обработке запроса.";
pub const TRANSLATION_ERROR_TEXT: &str = "Не удалось перевести сообщение. Попробуйте позже.";
pub const UNRECOGNIZED_RESULT_TEXT: &str = "Модель вернула нераспознанный результат.";
pub const TEXT_ONLY_TEXT: &str = "Пожалуйста, отправьте текстовое сообщение.";

/// Which handler an incoming message belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Welcome,
    Analyze(&'a str),
    NonText,
}

/// Message handlers with their collaborators injected
pub struct BotHandlers {
    translator: Arc<dyn Translator>,
    predictor: Arc<dyn Predictor>,
    source_language: String,
    target_language: String,
    bot_username: Option<String>,
}

impl BotHandlers {
    pub fn new(
        translator: Arc<dyn Translator>,
        predictor: Arc<dyn Predictor>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            predictor,
            source_language: source_language.into(),
            target_language: target_language.into(),
            bot_username: None,
        }
    }

    /// Only `/command@<username>` addressed to this bot counts as a command
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    pub fn route<'a>(&self, text: Option<&'a str>) -> Route<'a> {
        let Some(text) = text else {
            return Route::NonText;
        };

        if let Some(command) = text.split_whitespace().next().and_then(|w| w.strip_prefix('/')) {
            let (name, mention) = match command.split_once('@') {
                Some((name, mention)) => (name, Some(mention)),
                None => (command, None),
            };
            let addressed_to_us = match (mention, &self.bot_username) {
                (None, _) => true,
                (Some(mention), Some(ours)) => mention.eq_ignore_ascii_case(ours),
                (Some(_), None) => false,
            };
            if addressed_to_us && matches!(name, "start" | "help") {
                return Route::Welcome;
            }
        }

        Route::Analyze(text)
    }

    /// Produce the reply for an incoming message
    pub async fn handle_message(&self, message: &Message) -> String {
        match self.route(message.text.as_deref()) {
            Route::Welcome => {
                debug!("Sending welcome to chat {}", message.chat.id);
                WELCOME_TEXT.to_string()
            }
            Route::Analyze(text) => self.process_text(text).await,
            Route::NonText => TEXT_ONLY_TEXT.to_string(),
        }
    }

    /// Translate, classify and describe `text`
    pub async fn process_text(&self, text: &str) -> String {
        let translation = self
            .translator
            .translate_text(text, &self.target_language, &self.source_language)
            .await;
        if !translation.success {
            warn!("Translation unavailable, not querying the model");
            return TRANSLATION_ERROR_TEXT.to_string();
        }

        let result = match self.predictor.predict(&translation.translated_text).await {
            Ok(result) => result,
            Err(e) => {
                error!("Prediction failed: {}", e);
                return PROCESSING_ERROR_TEXT.to_string();
            }
        };

        match format_model_results(&result) {
            Ok(formatted) => {
                info!("Classified message as {:?}", result.first().map(|p| &p.label));
                format!("{}{}", RESULT_HEADER, formatted)
            }
            Err(e @ FormatError::UnrecognizedLabel(_)) => {
                error!("{}", e);
                UNRECOGNIZED_RESULT_TEXT.to_string()
            }
            Err(e) => {
                error!("{}", e);
                PROCESSING_ERROR_TEXT.to_string()
            }
        }
    }
}
