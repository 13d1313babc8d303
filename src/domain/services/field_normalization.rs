use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    domain::entities::person_record::{NormalizedFields, PersonRecord},
    helper::error_chain_fmt,
    ports::{CapabilityError, LlmClient},
};

/// First brace-delimited span of the model output. `(?s)` lets `.` cross line
/// breaks, and the greedy body spans up to the last closing brace.
static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

#[derive(thiserror::Error)]
pub enum FieldNormalizationError {
    #[error("Language model call failed: {0}")]
    ModelError(#[from] CapabilityError),
    #[error("The model answer did not contain a valid JSON record: {0}. Answer: {1}")]
    InvalidJson(serde_json::Error, String),
}

impl std::fmt::Debug for FieldNormalizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Maps raw OCR text into the fixed `PersonRecord` schema by prompting a
/// language model and parsing its answer as data.
pub struct FieldNormalizer {
    llm: Arc<dyn LlmClient>,
}

impl FieldNormalizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// # Returns
    /// - `Structured` when a JSON object could be located and parsed in the
    ///   model answer;
    /// - `Raw` with the full decoded answer when no brace-delimited span exists
    ///   (degraded fallback, callers must not treat it as a valid record);
    /// - an error when the located span is not valid JSON. No retry is attempted.
    #[tracing::instrument(name = "Normalizing OCR text into fields", skip(self, raw_text))]
    pub async fn normalize(
        &self,
        raw_text: &str,
    ) -> Result<NormalizedFields, FieldNormalizationError> {
        let prompt = build_prompt(raw_text);

        let decoded = self.llm.generate(&prompt).await?;

        match JSON_SPAN.find(&decoded) {
            Some(span) => {
                let record: PersonRecord = serde_json::from_str(span.as_str())
                    .map_err(|e| FieldNormalizationError::InvalidJson(e, decoded.clone()))?;
                info!("Normalized OCR text into a structured record");
                Ok(NormalizedFields::Structured(record))
            }
            None => {
                warn!("No JSON object in the model answer, returning the raw answer");
                Ok(NormalizedFields::Raw(decoded))
            }
        }
    }
}

fn build_prompt(raw_text: &str) -> String {
    format!(
        r#"
You are a data extraction system.

Extract these fields from the OCR text:
- name_native
- name_romanized : romanization of the native name, surname first. Capitalize the first letter of each syllable of the given name, e.g. "Sun JianFen".
- birthday (YYYY-MM-DD)
- secondary_date (YYYY-MM-DD)
- phone : consecutive digit string
- address : rewrite into a well-formed address
- origin_region : region or province the person comes from

OCR text:
{raw_text}

Return JSON only. Put null at appropriate places.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    struct CannedLlm {
        answer: String,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Ok(self.answer.clone())
        }
    }

    fn normalizer_answering(answer: &str) -> FieldNormalizer {
        FieldNormalizer::new(Arc::new(CannedLlm {
            answer: answer.to_string(),
        }))
    }

    #[tokio::test]
    async fn a_json_answer_parses_into_a_structured_record() {
        let normalizer = normalizer_answering(
            r#"Sure, here is the extraction:
{"name_native": "孙建芬", "name_romanized": "Sun JianFen", "birthday": "1975-03-02", "secondary_date": null, "phone": "0912345678", "address": null, "origin_region": null}"#,
        );

        let normalized = normalizer.normalize("some ocr text").await.unwrap();

        let NormalizedFields::Structured(record) = normalized else {
            panic!("expected a structured record");
        };
        assert_eq!(record.name_romanized.as_deref(), Some("Sun JianFen"));
        assert_eq!(record.birthday.as_deref(), Some("1975-03-02"));
        assert_eq!(record.secondary_date, None);
    }

    #[tokio::test]
    async fn an_answer_without_json_falls_back_to_the_raw_answer() {
        let normalizer = normalizer_answering("I could not find any field in this text.");

        let normalized = normalizer.normalize("gibberish").await.unwrap();

        assert_eq!(
            normalized,
            NormalizedFields::Raw("I could not find any field in this text.".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_json_inside_the_span_is_a_parse_failure() {
        let normalizer = normalizer_answering(r#"{"name_native": }"#);

        let result = normalizer.normalize("some ocr text").await;

        assert!(matches!(
            result,
            Err(FieldNormalizationError::InvalidJson(_, _))
        ));
    }

    #[tokio::test]
    async fn model_errors_propagate() {
        struct FailingLlm;

        #[async_trait]
        impl LlmClient for FailingLlm {
            async fn generate(&self, _prompt: &str) -> Result<String, CapabilityError> {
                Err(CapabilityError::Connection("refused".into()))
            }
        }

        let normalizer = FieldNormalizer::new(Arc::new(FailingLlm));
        let result = normalizer.normalize("some ocr text").await;

        assert!(matches!(
            result,
            Err(FieldNormalizationError::ModelError(_))
        ));
    }

    #[test]
    fn the_prompt_carries_the_raw_text_and_the_field_list() {
        let prompt = build_prompt("id card 123");

        assert!(prompt.contains("id card 123"));
        for field in [
            "name_native",
            "name_romanized",
            "birthday",
            "secondary_date",
            "phone",
            "address",
            "origin_region",
        ] {
            assert!(prompt.contains(field), "missing field {field}");
        }
        assert!(prompt.contains("Return JSON only."));
    }
}
