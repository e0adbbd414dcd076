use crate::config::UploadRules;
use crate::models::UploadBatch;
use serde::Serialize;
use std::collections::BTreeMap;

pub const FILE_TOO_LARGE: &str = "File size is larger than allowed";
pub const ONLY_PDF_ALLOWED: &str = "Only PDF are allowed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Offending property, e.g. `Files[2].Length`
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    fn new(field: String, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Failures grouped by field, the shape returned to HTTP callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationFailures(pub BTreeMap<String, Vec<String>>);

impl ValidationFailures {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<Vec<ValidationFailure>> for ValidationFailures {
    fn from(failures: Vec<ValidationFailure>) -> Self {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for failure in failures {
            grouped
                .entry(failure.field)
                .or_default()
                .push(failure.message);
        }
        Self(grouped)
    }
}

/// Checks every file of the batch against `rules`.
///
/// All failures are collected; a file may contribute one failure per rule.
/// An empty result means the batch may be uploaded.
pub fn validate_batch(batch: &UploadBatch, rules: &UploadRules) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    for (index, part) in batch.iter().enumerate() {
        if part.size() > rules.max_file_size {
            failures.push(ValidationFailure::new(
                format!("Files[{}].Length", index),
                FILE_TOO_LARGE,
            ));
        }

        let content_type_ok = part
            .content_type
            .as_deref()
            .is_some_and(|ct| ct == rules.allowed_content_type);
        if !content_type_ok {
            failures.push(ValidationFailure::new(
                format!("Files[{}].ContentType", index),
                ONLY_PDF_ALLOWED,
            ));
        }
    }

    failures
}

/// [`validate_batch`] with the default 5,000,000 byte / PDF-only rules.
pub fn validate(batch: &UploadBatch) -> Vec<ValidationFailure> {
    validate_batch(batch, &UploadRules::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadPart;

    fn pdf(name: &str, size: usize) -> UploadPart {
        UploadPart::new(name, Some("application/pdf"), vec![0u8; size])
    }

    #[test]
    fn test_valid_batch_has_no_failures() {
        let batch = UploadBatch::from(vec![pdf("a.pdf", 10), pdf("b.pdf", 5_000_000)]);
        assert!(validate(&batch).is_empty());
    }

    #[test]
    fn test_empty_batch_has_no_failures() {
        assert!(validate(&UploadBatch::new()).is_empty());
    }

    #[test]
    fn test_oversized_file() {
        let batch = UploadBatch::from(vec![pdf("big.pdf", 5_000_001)]);
        let failures = validate(&batch);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "Files[0].Length");
        assert_eq!(failures[0].message, FILE_TOO_LARGE);
    }

    #[test]
    fn test_wrong_content_type() {
        let batch = UploadBatch::from(vec![UploadPart::new(
            "pic.png",
            Some("image/png"),
            vec![1u8; 4],
        )]);
        let failures = validate(&batch);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "Only PDF are allowed");
    }

    #[test]
    fn test_missing_content_type() {
        let batch = UploadBatch::from(vec![UploadPart::new("x.pdf", None, vec![1u8; 4])]);
        let failures = validate(&batch);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "Files[0].ContentType");
    }

    #[test]
    fn test_content_type_must_match_exactly() {
        for ct in ["Application/PDF", "application/pdf; charset=binary", " application/pdf"] {
            let batch = UploadBatch::from(vec![UploadPart::new("x.pdf", Some(ct), vec![1u8])]);
            assert_eq!(validate(&batch).len(), 1, "content type {:?}", ct);
        }
    }

    #[test]
    fn test_both_rules_fail() {
        let batch = UploadBatch::from(vec![UploadPart::new(
            "huge.png",
            Some("image/png"),
            vec![0u8; 5_000_001],
        )]);
        let failures = validate(&batch);
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_failures_keep_batch_order_and_group_by_field() {
        let batch = UploadBatch::from(vec![
            pdf("ok.pdf", 1),
            UploadPart::new("a.txt", Some("text/plain"), vec![0u8; 1]),
            pdf("big.pdf", 5_000_001),
        ]);
        let failures = validate(&batch);
        assert_eq!(
            failures.iter().map(|f| f.field.as_str()).collect::<Vec<_>>(),
            vec!["Files[1].ContentType", "Files[2].Length"]
        );

        let grouped = ValidationFailures::from(failures);
        assert_eq!(
            grouped.get("Files[1].ContentType"),
            Some(&["Only PDF are allowed".to_string()][..])
        );
        assert!(grouped.get("Files[0].Length").is_none());
    }

    #[test]
    fn test_custom_rules() {
        let rules = UploadRules {
            max_file_size: 2,
            ..UploadRules::default()
        };
        let batch = UploadBatch::from(vec![pdf("a.pdf", 3)]);
        assert_eq!(validate_batch(&batch, &rules).len(), 1);
        assert!(validate(&batch).is_empty());
    }
}
