use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use packtrace_core::ScanConfig;
use thiserror::Error;

use crate::aggregate;
use crate::extract::{self, Grammar, GrammarError};
use crate::hash;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrError, TextRecognizer};
use crate::types::{ScanOutcome, VariantReading};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Text recognition failed on variant {variant}: {source}")]
    Ocr {
        variant: String,
        #[source]
        source: OcrError,
    },
}

/// Orchestrates one scan: decode → preprocess variants → recognize each →
/// extract candidates → aggregate.
///
/// Stateless across invocations; each call is a pure function of the input
/// bytes (modulo the external recognizer). Variants run concurrently on the
/// blocking pool but are joined in variant order, so the aggregator's
/// encounter-order tie-break is independent of scheduling.
///
/// Failure policy: a recognizer error or deadline overrun on any variant
/// fails the whole scan — a failed engine call never degrades into "that
/// variant saw nothing", so the caller can tell "retake photo" apart from
/// "system error".
pub struct ScanPipeline<R: TextRecognizer> {
    recognizer: Arc<R>,
    grammar: Grammar,
    preprocess: packtrace_core::PreprocessConfig,
    timeout: Duration,
}

impl<R: TextRecognizer + 'static> ScanPipeline<R> {
    /// Compiles the configured grammars; malformed patterns fail here, at
    /// initialization, never per request.
    pub fn new(recognizer: R, cfg: &ScanConfig) -> Result<Self, GrammarError> {
        Ok(Self {
            recognizer: Arc::new(recognizer),
            grammar: Grammar::from_config(&cfg.grammar)?,
            preprocess: cfg.preprocess.clone(),
            timeout: Duration::from_secs(cfg.recognizer.timeout_secs),
        })
    }

    /// Scan a photo already in memory.
    pub async fn scan_bytes(&self, data: &[u8]) -> Result<ScanOutcome, PipelineError> {
        let image_sha256 = hash::to_hex(&hash::sha256_bytes(data));

        // Undecodable input fails before any recognizer call.
        let img = preprocess::decode_image(data)?;
        let variants = preprocess::preprocess(&img, &self.preprocess)?;

        let mut tasks = Vec::with_capacity(variants.len());
        for variant in variants {
            let recognizer = Arc::clone(&self.recognizer);
            let name = variant.kind.to_string();
            let handle =
                tokio::task::spawn_blocking(move || recognizer.recognize(&variant.png));
            tasks.push((name, handle));
        }

        let mut readings = Vec::with_capacity(tasks.len());
        for (variant, handle) in tasks {
            let text = match tokio::time::timeout(self.timeout, handle).await {
                Err(_) => {
                    return Err(PipelineError::Ocr {
                        variant,
                        source: OcrError::Timeout(self.timeout.as_secs()),
                    });
                }
                Ok(Err(join_err)) => {
                    return Err(PipelineError::Ocr {
                        variant,
                        source: OcrError::Engine(join_err.to_string()),
                    });
                }
                Ok(Ok(Err(ocr_err))) => {
                    return Err(PipelineError::Ocr { variant, source: ocr_err });
                }
                Ok(Ok(Ok(text))) => text,
            };
            readings.push(VariantReading {
                text_chars: text.chars().count(),
                codes: extract::extract_codes(&self.grammar, &text),
                dates: extract::extract_dates(&self.grammar, &text),
                variant,
            });
        }

        let result = aggregate::aggregate(&readings);
        Ok(ScanOutcome { image_sha256, result, readings })
    }

    /// Scan a photo on disk.
    pub async fn scan_file(&self, path: &Path) -> Result<ScanOutcome, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.scan_bytes(&bytes).await
    }
}
