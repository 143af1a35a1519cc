use serde::{Deserialize, Serialize};

/// Body of a successful `POST /predict`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub class_id: usize,
    pub class_name: String,
    /// Percentage, rounded to two decimals.
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_serializes_with_wire_field_names() {
        let response = PredictionResponse {
            class_id: 37,
            class_name: "Tomato___healthy".into(),
            confidence: 98.76,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "class_id": 37,
                "class_name": "Tomato___healthy",
                "confidence": 98.76
            })
        );
    }

    #[test]
    fn error_body_has_single_error_field() {
        let body = serde_json::to_string(&ErrorResponse::new("No image uploaded")).unwrap();
        assert_eq!(body, r#"{"error":"No image uploaded"}"#);
    }
}
