//! Core data types for the RFQ cleaning system.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timezone-naive point in time, normalized to UTC.
pub type Timestamp = NaiveDateTime;

/// Quantity type.
pub type Quantity = f64;

/// Formats carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without an offset; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only formats; midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp cell into a naive UTC timestamp.
///
/// Returns `None` for empty or unparseable input; callers treat that as
/// "undated" rather than as an error.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }

    // "Z" and " UTC" suffixes mean the naive part is already UTC
    let s = s
        .strip_suffix(" UTC")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s)
        .trim_end();

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Coerce a quantity cell to a finite number.
///
/// Returns `None` for empty, non-numeric or non-finite input.
pub fn parse_quantity(raw: &str) -> Option<Quantity> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Volume tier of an entity, by median quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTier {
    /// Median at or below the low ceiling.
    Low,
    /// Median above the low ceiling and at or below the medium ceiling.
    Medium,
    /// Median above the medium ceiling.
    High,
}

impl VolumeTier {
    /// Classify a median against the tier ceilings.
    pub fn classify(median: f64, low_max: f64, medium_max: f64) -> Self {
        if median <= low_max {
            VolumeTier::Low
        } else if median <= medium_max {
            VolumeTier::Medium
        } else {
            VolumeTier::High
        }
    }
}

impl fmt::Display for VolumeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTier::Low => write!(f, "LOW"),
            VolumeTier::Medium => write!(f, "MEDIUM"),
            VolumeTier::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome counts of a deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Rows in the input table.
    pub total_rows: usize,
    /// Rows kept.
    pub kept_rows: usize,
    /// Rows discarded as duplicates.
    pub removed_rows: usize,
    /// Distinct business-key groups.
    pub groups: usize,
    /// Rows whose timestamp could not be parsed.
    pub undated_rows: usize,
}

/// Dataset-wide quantity statistics used as caps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalQuantityStats {
    /// Number of valid numeric quantities.
    pub valid_count: usize,
    /// Median quantity.
    pub median: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile; caps the LOW tier.
    pub p99: f64,
    /// 99.9th percentile; caps the MEDIUM and HIGH tiers.
    pub p999: f64,
}

/// Per-entity record of quantities removed as outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityOutlierSummary {
    /// Entity identifier (part number).
    pub entity: String,
    /// Volume tier.
    pub tier: VolumeTier,
    /// Median quantity.
    pub median: f64,
    /// Interquartile range.
    pub iqr: f64,
    /// Maximum quantity before removal.
    pub max_before: f64,
    /// Final upper threshold.
    pub threshold: f64,
    /// Removed quantities, in table order.
    pub removed_quantities: Vec<f64>,
}

/// Outcome of an outlier filtering pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Rows in the input table.
    pub original_rows: usize,
    /// Rows removed.
    pub removed_rows: usize,
    /// Dataset-wide statistics (absent when no valid quantity exists).
    pub global: Option<GlobalQuantityStats>,
    /// Entities that lost at least one record.
    pub entities: Vec<EntityOutlierSummary>,
}

impl OutlierReport {
    /// Rows remaining after removal.
    pub fn final_rows(&self) -> usize {
        self.original_rows - self.removed_rows
    }

    /// Fraction of rows removed (0 for an empty table).
    pub fn removal_rate(&self) -> f64 {
        if self.original_rows > 0 {
            self.removed_rows as f64 / self.original_rows as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = ymd_hms(2024, 3, 5, 14, 30, 0);
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30:00 UTC"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30"), Some(expected));
        assert_eq!(parse_timestamp("03/05/2024 14:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(ymd_hms(2024, 3, 5, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_timestamp_converts_offset_to_utc() {
        assert_eq!(
            parse_timestamp("2024-03-05 16:30:00+02:00"),
            Some(ymd_hms(2024, 3, 5, 14, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T09:30:00-05:00"),
            Some(ymd_hms(2024, 3, 5, 14, 30, 0))
        );
    }

    #[test]
    fn test_parse_timestamp_undated() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("42"), Some(42.0));
        assert_eq!(parse_quantity(" 2.5 "), Some(2.5));
        assert_eq!(parse_quantity("1e3"), Some(1000.0));
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("N/A"), None);
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("inf"), None);
    }

    #[test]
    fn test_volume_tier_boundaries() {
        assert_eq!(VolumeTier::classify(10.0, 10.0, 100.0), VolumeTier::Low);
        assert_eq!(VolumeTier::classify(10.5, 10.0, 100.0), VolumeTier::Medium);
        assert_eq!(VolumeTier::classify(100.0, 10.0, 100.0), VolumeTier::Medium);
        assert_eq!(VolumeTier::classify(100.5, 10.0, 100.0), VolumeTier::High);
        assert_eq!(VolumeTier::High.to_string(), "HIGH");
    }

    #[test]
    fn test_removal_rate() {
        let report = OutlierReport {
            original_rows: 200,
            removed_rows: 5,
            ..Default::default()
        };
        assert_eq!(report.final_rows(), 195);
        assert!((report.removal_rate() - 0.025).abs() < 1e-12);
        assert_eq!(OutlierReport::default().removal_rate(), 0.0);
    }
}
