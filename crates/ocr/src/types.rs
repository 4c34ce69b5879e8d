use serde::{Deserialize, Serialize};

/// Candidates pulled out of one variant's recognizer output.
/// Codes are raw grammar matches; dates keep duplicates — the aggregator
/// counts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReading {
    /// Variant name, e.g. "grayscale" or "dilate-heavy".
    pub variant: String,
    /// Length of the recognizer's raw text, in chars. Lets the operator see
    /// which variants saw anything at all without shipping the blob itself.
    pub text_chars: usize,
    pub codes: Vec<String>,
    pub dates: Vec<String>,
}

/// The aggregate handed to the caller: deduplicated, sorted codes and a
/// single voted date ("" when no date-shaped token was seen anywhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub codes: Vec<String>,
    pub date: String,
}

impl ScanResult {
    /// True when the scan found nothing at all. A valid terminal outcome —
    /// the caller prompts for manual entry, it is not an error.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.date.is_empty()
    }
}

/// Full output of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// SHA-256 hex digest of the uploaded bytes — the stable image
    /// reference recorded in the audit trail.
    pub image_sha256: String,
    pub result: ScanResult,
    /// Per-variant candidates, in variant order, for operator display.
    pub readings: Vec<VariantReading>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_empty() {
        let r = ScanResult { codes: vec![], date: String::new() };
        assert!(r.is_empty());
    }

    #[test]
    fn date_alone_is_not_empty() {
        let r = ScanResult { codes: vec![], date: "21/08/25".to_string() };
        assert!(!r.is_empty());
    }

    #[test]
    fn codes_alone_are_not_empty() {
        let r = ScanResult { codes: vec!["ABC 123 XYZ 789".to_string()], date: String::new() };
        assert!(!r.is_empty());
    }
}
