use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Emotion classes in the exact order of the model's output vector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter, EnumCount, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmotionClass {
    Angry,
    Happy,
    Relaxed,
    Sad,
}

impl EmotionClass {
    pub fn from_index(index: usize) -> Option<Self> {
        EmotionClass::iter().nth(index)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used for this class in the `emotions` object of an extended response.
    pub fn presentation_name(self) -> &'static str {
        match self {
            EmotionClass::Angry => "anger",
            EmotionClass::Happy => "happiness",
            EmotionClass::Relaxed => "neutral",
            EmotionClass::Sad => "sadness",
        }
    }
}

/// Integer percentages per class, keyed by presentation name.
///
/// Signed and unbounded: a model emitting logits yields values outside `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub neutral: i32,
    pub anger: i32,
    pub happiness: i32,
    pub sadness: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePrediction {
    pub prediction: EmotionClass,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedPrediction {
    pub prediction: EmotionClass,
    pub emotions: EmotionScores,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of every `/predict` response. All variants are sent with status 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Extended(ExtendedPrediction),
    Simple(SimplePrediction),
    Error(ErrorResponse),
}

impl PredictionResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PredictionResponse::Error(ErrorResponse {
            error: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResponse::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::EnumCount;

    #[test]
    fn class_order_matches_model_output() {
        let names: Vec<String> = EmotionClass::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["angry", "happy", "relaxed", "sad"]);
        assert_eq!(EmotionClass::COUNT, 4);
        assert_eq!(EmotionClass::from_index(2), Some(EmotionClass::Relaxed));
        assert_eq!(EmotionClass::from_index(4), None);
        assert_eq!(EmotionClass::from_str("sad").unwrap(), EmotionClass::Sad);
    }

    #[test]
    fn relaxed_is_presented_as_neutral() {
        assert_eq!(EmotionClass::Relaxed.presentation_name(), "neutral");
        assert_eq!(EmotionClass::Angry.presentation_name(), "anger");
    }

    #[test]
    fn response_bodies_have_expected_shape() {
        let extended = PredictionResponse::Extended(ExtendedPrediction {
            prediction: EmotionClass::Happy,
            emotions: EmotionScores {
                neutral: 10,
                anger: 5,
                happiness: 80,
                sadness: 5,
            },
            image_url: None,
        });
        let value = serde_json::to_value(&extended).unwrap();
        assert_eq!(value["prediction"], "happy");
        assert_eq!(value["emotions"]["happiness"], 80);
        assert!(value["image_url"].is_null());

        let error = serde_json::to_value(PredictionResponse::error("bad image")).unwrap();
        assert_eq!(error, serde_json::json!({ "error": "bad image" }));
    }

    #[test]
    fn untagged_bodies_deserialize_to_the_right_variant() {
        let simple: PredictionResponse =
            serde_json::from_str(r#"{"prediction":"sad","confidence":0.75}"#).unwrap();
        assert!(matches!(simple, PredictionResponse::Simple(_)));

        let error: PredictionResponse = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(error.is_error());
    }
}
