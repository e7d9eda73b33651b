//! Keyword-based severity classification.
//!
//! Keywords are matched as substrings of the uppercased line, so `"3"`
//! matches `"ZONE 3"` and also `"T=23C"`. Devices are expected to send the
//! bare level digit or one of the words below.

use core_types::Severity;

/// Checked first: any match makes the line Critical.
pub const CRITICAL_KEYWORDS: &[&str] = &[
    "ALERT",
    "ALERTE",
    "SOS",
    "3",
    "URGENT",
    "CRITICAL",
    "EMERGENCY",
];

pub const WARNING_KEYWORDS: &[&str] = &["WARN", "WARNING", "2", "ATTENTION"];

pub const INFO_KEYWORDS: &[&str] = &["INFO", "1", "OK", "STATUS"];

/// Map a line to its severity. Unrecognized content is Info.
pub fn classify(line: &str) -> Severity {
    let upper = line.to_uppercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| upper.contains(k));

    if matches(CRITICAL_KEYWORDS) {
        Severity::Critical
    } else if matches(WARNING_KEYWORDS) {
        Severity::Warning
    } else {
        // INFO_KEYWORDS and no match both land here
        Severity::Info
    }
}
