pub mod aggregate;
pub mod extract;
pub mod hash;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use aggregate::{aggregate, normalize_date};
pub use extract::{extract_codes, extract_dates, Grammar, GrammarError};
pub use hash::{sha256_bytes, to_hex};
pub use pipeline::{PipelineError, ScanPipeline};
pub use preprocess::{decode_image, preprocess, PreprocessError, PreprocessVariant};
pub use recognizer::{MockRecognizer, OcrError, TextRecognizer};
pub use types::{ScanOutcome, ScanResult, VariantReading};
