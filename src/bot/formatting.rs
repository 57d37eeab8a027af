use thiserror::Error;

use crate::prediction::Prediction;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("Prediction result is empty")]
    EmptyResult,
    #[error("Unrecognized classification label: {0}")]
    UnrecognizedLabel(String),
}

/// Labels produced by the depression classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepressionLabel {
    NotDepression,
    Moderate,
    Severe,
    Unknown(String),
}

impl DepressionLabel {
    pub fn parse(label: &str) -> Self {
        match label {
            "not depression" => Self::NotDepression,
            "moderate" => Self::Moderate,
            "severe" => Self::Severe,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// User-facing description; `None` for labels the bot does not know
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::NotDepression => Some("Депрессия отсутствует или мало выражена"),
            Self::Moderate => Some("Умеренная депрессия"),
            Self::Severe => Some("Сильная депрессия"),
            Self::Unknown(_) => None,
        }
    }
}

/// Confidence as a whole percentage, `round(score * 100)`
pub fn confidence_percent(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Render the top classification as the bot's answer text
pub fn format_model_results(result: &[Prediction]) -> Result<String, FormatError> {
    let top = result.first().ok_or(FormatError::EmptyResult)?;

    let label = DepressionLabel::parse(&top.label);
    let description = label
        .description()
        .ok_or_else(|| FormatError::UnrecognizedLabel(top.label.clone()))?;

    Ok(format!(
        "{}\nУверенность модели: {}%",
        description,
        confidence_percent(top.score)
    ))
}
