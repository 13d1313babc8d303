use indexmap::IndexMap;
use serde::Serialize;

use crate::domain::entities::person_record::NormalizedFields;

/// Aggregated outcome of one extraction run.
///
/// Detection misses are reported through the per-stage result fields, not as
/// errors: a run that found neither a face nor a paper region still reports
/// `status: ok` with both result flags false and the dependent fields null.
#[derive(Debug, Serialize)]
pub struct ExtractionReport {
    pub status: String,
    /// Job key of the raw image this run worked on
    pub filename: String,
    pub headshot_result: bool,
    /// `None` when background removal is not configured
    pub headshot_rembg_result: Option<bool>,
    pub paper_result: bool,
    /// Raw OCR text; `None` when no paper region was found
    pub extract_ocr_result: Option<String>,
    /// Normalized fields; `None` when no paper region was found
    pub parse_ocr_result: Option<NormalizedFields>,
    /// Elapsed seconds per attempted stage, in execution order
    pub timing: IndexMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::person_record::PersonRecord;

    #[test]
    fn report_serializes_with_the_run_shape() {
        let mut timing = IndexMap::new();
        timing.insert("download".to_string(), 0.1234);
        timing.insert("headshot_inference".to_string(), 0.5);

        let report = ExtractionReport {
            status: "ok".into(),
            filename: "abc123.jpg".into(),
            headshot_result: true,
            headshot_rembg_result: None,
            paper_result: false,
            extract_ocr_result: None,
            parse_ocr_result: Some(NormalizedFields::Structured(PersonRecord::default())),
            timing,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["filename"], "abc123.jpg");
        assert_eq!(value["headshot_result"], true);
        // Background removal not configured: reported as null, not false
        assert_eq!(value["headshot_rembg_result"], serde_json::Value::Null);
        assert_eq!(value["timing"]["download"], 0.1234);
    }
}
