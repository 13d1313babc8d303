use serde::{Deserialize, Serialize};

/// Structured personal fields read from an identity document.
///
/// Every field is independently nullable: an absent value means the field was
/// not found on the document, not that the normalization failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonRecord {
    pub name_native: Option<String>,
    pub name_romanized: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub birthday: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub secondary_date: Option<String>,
    /// Consecutive digit string
    pub phone: Option<String>,
    pub address: Option<String>,
    pub origin_region: Option<String>,
}

/// Outcome of the field normalization stage.
///
/// The degraded `Raw` variant carries the model's decoded answer when no JSON
/// object could be located in it. Callers must not treat it as a valid record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedFields {
    Structured(PersonRecord),
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_fields_deserialize_to_none() {
        let record: PersonRecord =
            serde_json::from_str(r#"{"name_native": "Doe", "birthday": null}"#).unwrap();

        assert_eq!(record.name_native.as_deref(), Some("Doe"));
        assert_eq!(record.birthday, None);
        assert_eq!(record.phone, None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let record: PersonRecord =
            serde_json::from_str(r#"{"name_native": "Doe", "unexpected": 42}"#).unwrap();

        assert_eq!(record.name_native.as_deref(), Some("Doe"));
    }

    #[test]
    fn structured_variant_serializes_as_a_json_object() {
        let fields = NormalizedFields::Structured(PersonRecord {
            name_native: Some("Doe".into()),
            ..PersonRecord::default()
        });

        let value = serde_json::to_value(&fields).unwrap();
        assert!(value.is_object());
        assert_eq!(value["name_native"], "Doe");
    }

    #[test]
    fn raw_variant_serializes_as_a_json_string() {
        let fields = NormalizedFields::Raw("could not parse".into());

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value, serde_json::json!("could not parse"));
    }
}
