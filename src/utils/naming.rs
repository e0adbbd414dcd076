use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Number of 100ns intervals elapsed since 0001-01-01T00:00:00Z.
pub fn ticks(at: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + at.timestamp() * TICKS_PER_SECOND
        + i64::from(at.timestamp_subsec_nanos() / 100)
}

/// Extension of `filename` including the leading dot, or an empty string.
pub fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Storage name for an uploaded file: `<ticks>_<uuid><extension>`.
///
/// No existence check is made; the random component keeps names distinct.
pub fn generate_unique_name(original: &str) -> String {
    unique_name_at(original, Utc::now())
}

pub fn unique_name_at(original: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}{}", ticks(at), Uuid::new_v4(), extension(original))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_ticks_at_unix_epoch() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(ticks(epoch), UNIX_EPOCH_TICKS);
    }

    #[test]
    fn test_ticks_resolution() {
        let at = Utc.timestamp_opt(1, 250).unwrap();
        assert_eq!(ticks(at), UNIX_EPOCH_TICKS + TICKS_PER_SECOND + 2);
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("report.pdf"), ".pdf");
        assert_eq!(extension("archive.tar.gz"), ".gz");
        assert_eq!(extension("README"), "");
        assert_eq!(extension("trailing."), "");
        assert_eq!(extension("dir/inner.PDF"), ".PDF");
    }

    #[test]
    fn test_unique_name_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let name = unique_name_at("invoice.pdf", at);
        let (stamp, rest) = name.split_once('_').unwrap();
        assert_eq!(stamp, ticks(at).to_string());
        assert!(rest.ends_with(".pdf"));
        let id = rest.trim_end_matches(".pdf");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_identical_names_never_collide() {
        let at = Utc::now();
        let names: HashSet<_> = (0..1000).map(|_| unique_name_at("same.pdf", at)).collect();
        assert_eq!(names.len(), 1000);
    }
}
