use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use wastewatch_types::models::{Classification, CollectionCheck};

const CLASSIFY_PROMPT: &str = "You are an expert in waste management and recycling. \
Analyze the attached image and report the dominant waste type, an estimated quantity \
with unit, and your confidence. Answer with JSON only, in this exact shape: \
{\"wasteType\": \"<type>\", \"quantity\": \"<amount with unit>\", \"confidence\": <0..1>}";

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The external call itself failed (transport error or non-2xx answer).
    #[error("classification service call failed: {0}")]
    Service(String),

    /// The service answered, but not with the JSON we asked for.
    #[error("classification response malformed: {0}")]
    Parse(String),
}

/// Client for the external multimodal classification service. Constructed
/// once at startup and passed into the handlers that need it; there is no
/// process-wide instance.
pub struct Classifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl Classifier {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// Classify a waste photo into type, quantity estimate and confidence.
    /// Pure call-and-parse: nothing is persisted here.
    pub async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Classification, ClassifyError> {
        let text = self.generate(CLASSIFY_PROMPT, image, mime_type).await?;
        parse_classification(&text)
    }

    /// Second verification pass at collection time: does the collected pile
    /// match what the report described?
    pub async fn verify_collection(
        &self,
        image: &[u8],
        mime_type: &str,
        expected_type: &str,
        expected_amount: &str,
    ) -> Result<CollectionCheck, ClassifyError> {
        let prompt = format!(
            "You are an expert in waste management and recycling. The attached image \
             shows a completed waste collection. The original report described the waste \
             as \"{expected_type}\" in quantity \"{expected_amount}\". Judge whether the \
             image matches. Answer with JSON only, in this exact shape: \
             {{\"wasteTypeMatch\": <bool>, \"quantityMatch\": <bool>, \"confidence\": <0..1>}}"
        );
        let text = self.generate(&prompt, image, mime_type).await?;
        parse_collection_check(&text)
    }

    /// One generate-content round trip: prompt + inline image in, the
    /// model's text answer out.
    async fn generate(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ClassifyError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": mime_type, "data": B64.encode(image) } },
                ],
            }],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Service(format!(
                "service answered {status}"
            )));
        }

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Service(e.to_string()))?;

        let text = extract_answer_text(&envelope)?;
        debug!("classifier answered: {}", text);
        Ok(text)
    }
}

/// Pull the model's text answer out of the generate-content envelope.
fn extract_answer_text(envelope: &serde_json::Value) -> Result<String, ClassifyError> {
    envelope["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ClassifyError::Parse("no text candidate in response".to_string()))
}

/// Models often wrap the requested JSON in a markdown code fence.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence.
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    waste_type: Option<String>,
    quantity: Option<String>,
    confidence: Option<f64>,
}

pub fn parse_classification(text: &str) -> Result<Classification, ClassifyError> {
    let raw: RawClassification = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| ClassifyError::Parse(e.to_string()))?;

    let waste_type = match raw.waste_type {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(ClassifyError::Parse("missing wasteType".to_string())),
    };
    let confidence = raw
        .confidence
        .ok_or_else(|| ClassifyError::Parse("missing confidence".to_string()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ClassifyError::Parse(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }

    Ok(Classification {
        waste_type,
        quantity: raw.quantity.unwrap_or_else(|| "unspecified".to_string()),
        confidence,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCollectionCheck {
    waste_type_match: Option<bool>,
    quantity_match: Option<bool>,
    confidence: Option<f64>,
}

pub fn parse_collection_check(text: &str) -> Result<CollectionCheck, ClassifyError> {
    let raw: RawCollectionCheck = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| ClassifyError::Parse(e.to_string()))?;

    let (Some(waste_type_match), Some(quantity_match), Some(confidence)) =
        (raw.waste_type_match, raw.quantity_match, raw.confidence)
    else {
        return Err(ClassifyError::Parse(
            "missing wasteTypeMatch, quantityMatch or confidence".to_string(),
        ));
    };
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ClassifyError::Parse(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }

    Ok(CollectionCheck {
        waste_type_match,
        quantity_match,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_answer() {
        let parsed = parse_classification(
            r#"{"wasteType": "plastic", "quantity": "2 kg", "confidence": 0.87}"#,
        )
        .unwrap();
        assert_eq!(parsed.waste_type, "plastic");
        assert_eq!(parsed.quantity, "2 kg");
        assert!((parsed.confidence - 0.87).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_fenced_json_answer() {
        let fenced = "```json\n{\"wasteType\": \"glass\", \"quantity\": \"5 bottles\", \"confidence\": 0.6}\n```";
        let parsed = parse_classification(fenced).unwrap();
        assert_eq!(parsed.waste_type, "glass");
        assert_eq!(parsed.quantity, "5 bottles");
    }

    #[test]
    fn missing_confidence_is_a_parse_error() {
        let err =
            parse_classification(r#"{"wasteType": "plastic", "quantity": "2 kg"}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[test]
    fn missing_waste_type_is_a_parse_error() {
        let err = parse_classification(r#"{"quantity": "2 kg", "confidence": 0.9}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[test]
    fn non_json_answer_is_a_parse_error() {
        let err = parse_classification("I think this is plastic, roughly 2 kg.").unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = parse_classification(
            r#"{"wasteType": "plastic", "quantity": "2 kg", "confidence": 1.4}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[test]
    fn quantity_defaults_when_absent() {
        let parsed =
            parse_classification(r#"{"wasteType": "e-waste", "confidence": 0.75}"#).unwrap();
        assert_eq!(parsed.quantity, "unspecified");
    }

    #[test]
    fn collection_check_parses_and_validates() {
        let parsed = parse_collection_check(
            r#"{"wasteTypeMatch": true, "quantityMatch": false, "confidence": 0.7}"#,
        )
        .unwrap();
        assert!(parsed.waste_type_match);
        assert!(!parsed.quantity_match);

        let err = parse_collection_check(r#"{"wasteTypeMatch": true, "confidence": 0.7}"#)
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[test]
    fn answer_text_is_extracted_from_envelope() {
        let envelope = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"wasteType\":\"paper\",\"confidence\":0.8}" }] }
            }]
        });
        let text = extract_answer_text(&envelope).unwrap();
        assert!(text.contains("paper"));

        let empty = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            extract_answer_text(&empty),
            Err(ClassifyError::Parse(_))
        ));
    }
}
