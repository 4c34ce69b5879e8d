use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One deterministic preprocessing transform applied to the source image
/// before recognition. The list and order of variants is static
/// configuration, not per-request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantKind {
    /// Luma conversion plus contrast stretch. Small print (dates) survives here.
    Grayscale,
    /// Grayscale then binarization at the configured luminance cutoff.
    Threshold,
    /// Threshold then one dilation pass. Starts fusing dot-matrix dots.
    DilateLight,
    /// Threshold then two dilation passes. Makes dot-matrix codes legible
    /// but destroys small printed dates.
    DilateHeavy,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Grayscale => write!(f, "grayscale"),
            VariantKind::Threshold => write!(f, "threshold"),
            VariantKind::DilateLight => write!(f, "dilate-light"),
            VariantKind::DilateHeavy => write!(f, "dilate-heavy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Luminance cutoff for binarization (0–255).
    pub threshold: u8,
    /// Side length of the square dilation structuring element, in pixels.
    pub dilate_kernel: u32,
    /// Images wider or taller than this are downscaled before variant derivation.
    pub max_dimension: u32,
    /// Ordered variant list. Order matters: it defines encounter order for
    /// the aggregator's tie-break.
    pub variants: Vec<VariantKind>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            threshold: 150,
            dilate_kernel: 2,
            max_dimension: 2800,
            variants: vec![
                VariantKind::Grayscale,
                VariantKind::Threshold,
                VariantKind::DilateLight,
                VariantKind::DilateHeavy,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Tesseract language pack.
    pub lang: String,
    /// Page segmentation mode, held constant across all variants.
    pub psm: u32,
    /// Deadline for a single recognizer call; elapse counts as engine failure.
    pub timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self { lang: "eng".to_string(), psm: 6, timeout_secs: 20 }
    }
}

/// Pattern strings for the token grammars. Compiled and validated once at
/// startup; an unparsable pattern is fatal at initialization, never at
/// per-request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Four groups of three upper-case alphanumerics, single-space separated.
    pub code_pattern: String,
    /// Manufacturing-date marker immediately followed by a date-shaped token.
    pub anchored_date_pattern: String,
    /// Loose date-shaped token used only when no anchored match exists.
    pub loose_date_pattern: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            code_pattern: r"\b[A-Z0-9]{3} [A-Z0-9]{3} [A-Z0-9]{3} [A-Z0-9]{3}\b".to_string(),
            anchored_date_pattern:
                r"(?i)\bMF[GD]\.?\s*(?:ON|DT)?\.?\s*[:\-]?\s*(\d{2}[./\- ]\d{2}[./\- ]\d{2,4})\b"
                    .to_string(),
            loose_date_pattern: r"\b\d{2}[./\- ]\d{2}[./\- ]\d{2,4}\b".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Spreadsheet holding the audit trail and the product list.
    pub spreadsheet_id: String,
    /// Worksheet the audit rows are appended to.
    pub log_worksheet: String,
    /// Worksheet whose first column lists product variants.
    pub products_worksheet: String,
    /// Path to the Google service-account JSON key file.
    pub key_path: String,
    /// Variant dropdown contents when the sheet is unreachable.
    pub fallback_variants: Vec<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            log_worksheet: "Log".to_string(),
            products_worksheet: "Products".to_string(),
            key_path: String::new(),
            fallback_variants: vec!["Manual Entry".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound on uploaded image size, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:3000".to_string(), max_upload_bytes: 20 * 1024 * 1024 }
    }
}

/// Top-level configuration, loaded from `packtrace.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub preprocess: PreprocessConfig,
    pub recognizer: RecognizerConfig,
    pub grammar: GrammarConfig,
    pub sheets: SheetsConfig,
    pub server: ServerConfig,
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Whether the audit-trail collaborator is configured at all.
    pub fn sheets_enabled(&self) -> bool {
        !self.sheets.spreadsheet_id.is_empty() && !self.sheets.key_path.is_empty()
    }
}
