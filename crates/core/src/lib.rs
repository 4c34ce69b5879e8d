pub mod config;
pub mod scan;

pub use config::{
    ConfigError, GrammarConfig, PreprocessConfig, RecognizerConfig, ScanConfig, ServerConfig,
    SheetsConfig, VariantKind,
};
pub use scan::{audit_rows, AuditRow, ScanMetadata};
