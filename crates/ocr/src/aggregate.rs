use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::types::{ScanResult, VariantReading};

/// Collapse every recognized separator (`.`, `-`, space) to `/` so that
/// "21.08.25", "21-08-25" and "21 08 25" vote as the same key. Idempotent:
/// an already-normalized string passes through unchanged.
pub fn normalize_date(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '.' | '-' | ' ') { '/' } else { c })
        .collect()
}

/// Merge per-variant candidates into the final result.
///
/// Codes: union across variants, deduplicated, lexicographically sorted —
/// repeated runs on identical input produce identical output regardless of
/// variant ordering.
///
/// Dates: normalized, then reduced by frequency. Ties break by earliest
/// encounter across the ordered variant sequence (variant index first,
/// match order within the variant second). No candidates → empty string.
pub fn aggregate(readings: &[VariantReading]) -> ScanResult {
    let codes: BTreeSet<&str> = readings
        .iter()
        .flat_map(|r| r.codes.iter().map(String::as_str))
        .collect();
    let codes: Vec<String> = codes.into_iter().map(str::to_string).collect();

    // key → (count, first-encounter index)
    let mut tally: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0usize;
    for reading in readings {
        for raw in &reading.dates {
            let entry = tally.entry(normalize_date(raw)).or_insert((0, order));
            entry.0 += 1;
            order += 1;
        }
    }
    let date = tally
        .into_iter()
        .min_by_key(|&(_, (count, first))| (Reverse(count), first))
        .map(|(key, _)| key)
        .unwrap_or_default();

    ScanResult { codes, date }
}
