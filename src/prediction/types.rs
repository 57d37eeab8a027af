use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub result: Vec<Prediction>,
}

/// One classification entry: label plus its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub score: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

/// Accept the score as a JSON number or a numeric string, and require it in `[0, 1]`
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawScore::deserialize(deserializer)? {
        RawScore::Number(n) => n,
        RawScore::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("score is not numeric: {:?}", s)))?,
    };

    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(de::Error::custom(format!(
            "score must be within [0, 1], got {}",
            value
        )));
    }
    Ok(value)
}
