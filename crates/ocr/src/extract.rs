use packtrace_core::GrammarConfig;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Invalid {name} pattern: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// The compiled token grammars. Built once at startup from configuration;
/// an unparsable pattern fails here, never at per-request time.
#[derive(Debug, Clone)]
pub struct Grammar {
    code: Regex,
    anchored_date: Regex,
    loose_date: Regex,
}

impl Grammar {
    pub fn from_config(cfg: &GrammarConfig) -> Result<Self, GrammarError> {
        Ok(Self {
            code: compile("code", &cfg.code_pattern)?,
            anchored_date: compile("anchored date", &cfg.anchored_date_pattern)?,
            loose_date: compile("loose date", &cfg.loose_date_pattern)?,
        })
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::from_config(&GrammarConfig::default()).expect("default grammar patterns are valid")
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|source| GrammarError::Pattern { name, source })
}

/// Every non-overlapping code-grammar match, in text order. No
/// normalization: a lowercase or irregularly spaced token simply fails to
/// match and is dropped (a recall trade-off, not an error).
pub fn extract_codes(grammar: &Grammar, text: &str) -> Vec<String> {
    grammar
        .code
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Date-shaped tokens, duplicates retained, in two tiers: anchored matches
/// (a manufacturing-date marker directly before the token) win outright;
/// only when no anchor matched does the loose whole-blob scan run.
pub fn extract_dates(grammar: &Grammar, text: &str) -> Vec<String> {
    let anchored: Vec<String> = grammar
        .anchored_date
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    if !anchored.is_empty() {
        return anchored;
    }
    grammar
        .loose_date
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Codes ────────────────────────────────────────────────────────────────

    #[test]
    fn code_basic_match() {
        let g = Grammar::default();
        let codes = extract_codes(&g, "scrap\nABC 123 XYZ 789\nscrap");
        assert_eq!(codes, vec!["ABC 123 XYZ 789"]);
    }

    #[test]
    fn code_multiple_matches_in_order() {
        let g = Grammar::default();
        let text = "DEF 456 UVW 012 then ABC 123 XYZ 789";
        let codes = extract_codes(&g, text);
        assert_eq!(codes, vec!["DEF 456 UVW 012", "ABC 123 XYZ 789"]);
    }

    #[test]
    fn code_lowercase_is_dropped() {
        let g = Grammar::default();
        assert!(extract_codes(&g, "abc 123 xyz 789").is_empty());
    }

    #[test]
    fn code_irregular_spacing_is_dropped() {
        let g = Grammar::default();
        assert!(extract_codes(&g, "ABC  123 XYZ 789").is_empty());
        assert!(extract_codes(&g, "ABC 123 XYZ\n789").is_empty());
    }

    #[test]
    fn code_wrong_group_length_is_dropped() {
        let g = Grammar::default();
        assert!(extract_codes(&g, "AB 123 XYZ 789").is_empty());
        // Four-character runs break the word boundary, so nothing matches.
        assert!(extract_codes(&g, "ABCD 123 XYZ 789 X").is_empty());
    }

    // ── Dates ────────────────────────────────────────────────────────────────

    #[test]
    fn anchored_date_beats_loose_date() {
        let g = Grammar::default();
        let text = "EXP 18.11.25\nMFD ON 21.08.25\nbatch 77.88.99";
        assert_eq!(extract_dates(&g, text), vec!["21.08.25"]);
    }

    #[test]
    fn anchor_spelling_variants() {
        let g = Grammar::default();
        assert_eq!(extract_dates(&g, "MFG.DT: 12-11-24"), vec!["12-11-24"]);
        assert_eq!(extract_dates(&g, "mfd on 21 08 25"), vec!["21 08 25"]);
        assert_eq!(extract_dates(&g, "Mfd. 21/08/2025"), vec!["21/08/2025"]);
    }

    #[test]
    fn loose_scan_runs_only_without_anchor() {
        let g = Grammar::default();
        let dates = extract_dates(&g, "printed 21.08.25 and 18-11-25");
        assert_eq!(dates, vec!["21.08.25", "18-11-25"]);
    }

    #[test]
    fn loose_scan_retains_duplicates() {
        let g = Grammar::default();
        let dates = extract_dates(&g, "21.08.25 noise 21.08.25");
        assert_eq!(dates.len(), 2);
    }

    #[test]
    fn no_date_shaped_token_yields_empty() {
        let g = Grammar::default();
        assert!(extract_dates(&g, "no dates here, just 5 digits 12345").is_empty());
    }

    // ── Grammar construction ─────────────────────────────────────────────────

    #[test]
    fn invalid_pattern_is_rejected() {
        let cfg = GrammarConfig {
            code_pattern: "[unclosed".to_string(),
            ..GrammarConfig::default()
        };
        assert!(matches!(
            Grammar::from_config(&cfg),
            Err(GrammarError::Pattern { name: "code", .. })
        ));
    }

    #[test]
    fn custom_code_pattern_is_used() {
        let cfg = GrammarConfig {
            code_pattern: r"\b[A-Z]{2}-\d{4}\b".to_string(),
            ..GrammarConfig::default()
        };
        let g = Grammar::from_config(&cfg).unwrap();
        assert_eq!(extract_codes(&g, "lot QA-1234 ok"), vec!["QA-1234"]);
        assert!(extract_codes(&g, "ABC 123 XYZ 789").is_empty());
    }
}
