use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::interface::{TranslationResult, Translator};
use crate::config::TranslatorConfig;

/// Yandex Cloud Translate v2 client
#[derive(Debug, Clone)]
pub struct YandexTranslator {
    client: Client,
    base_url: String,
    api_key: String,
    folder_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    #[serde(rename = "folder_id")]
    folder_id: &'a str,
    texts: [&'a str; 1],
    target_language_code: &'a str,
    source_language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    text: String,
    detected_language_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    folder_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    language_code: Option<String>,
}

impl YandexTranslator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        folder_id: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let base: String = base_url.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            folder_id: folder_id.into(),
        })
    }

    pub fn from_config(config: &TranslatorConfig) -> reqwest::Result<Self> {
        Self::new(
            &config.base_url,
            &config.api_key,
            &config.folder_id,
            config.timeout(),
        )
    }

    fn auth_header(&self) -> String {
        format!("Api-Key {}", self.api_key)
    }

    async fn request_translation(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> Result<TranslationResult> {
        let payload = TranslateRequest {
            folder_id: &self.folder_id,
            texts: [text],
            target_language_code: target_language,
            source_language_code: source_language,
        };

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: TranslateResponse = response.json().await?;
        let translation = body
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no translations returned by the API"))?;

        Ok(TranslationResult::ok(
            translation.text,
            translation
                .detected_language_code
                .unwrap_or_else(|| "unknown".to_string()),
        ))
    }

    async fn request_detection(&self, text: &str) -> Result<Option<String>> {
        let payload = DetectRequest {
            folder_id: &self.folder_id,
            text,
        };

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: DetectResponse = response.json().await?;
        Ok(body.language_code)
    }
}

#[async_trait]
impl Translator for YandexTranslator {
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
    ) -> TranslationResult {
        debug!(
            "Translating {} chars {} -> {}",
            text.chars().count(),
            source_language,
            target_language
        );
        match self
            .request_translation(text, target_language, source_language)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!("Translation failed: {:#}", e);
                TranslationResult::failed()
            }
        }
    }

    async fn detect_language(&self, text: &str) -> Option<String> {
        match self.request_detection(text).await {
            Ok(code) => code,
            Err(e) => {
                error!("Language detection failed: {:#}", e);
                None
            }
        }
    }
}
