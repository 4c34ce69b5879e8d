use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Recognizer call exceeded the {0}s deadline")]
    Timeout(u64),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over the external text-recognition capability.
/// Implementations accept PNG image bytes and return the engine's literal
/// text output. Failure is always an explicit error, never an empty string:
/// the pipeline cannot tell "no text present" from "engine failed" otherwise.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string — drives pipeline and extraction tests without
/// requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrError, TextRecognizer};
    use leptess::{LepTess, Variable};

    /// Tesseract with one fixed engine configuration for every variant, so
    /// recognizer behavior differs only because the bitmap does.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
        psm: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str, psm: u32) -> Self {
            Self {
                data_path,
                lang: lang.to_string(),
                psm: psm.to_string(),
            }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &self.psm)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            // Dot-code prints sit around 300 DPI; must be set after the image.
            lt.set_source_resolution(300);
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("ABC 123 XYZ 789\nMFD ON 21.08.25");
        assert_eq!(
            r.recognize(b"fake image data").unwrap(),
            "ABC 123 XYZ 789\nMFD ON 21.08.25"
        );
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.recognize(b"anything").unwrap(), "hello");
        assert_eq!(r.recognize(b"").unwrap(), "hello");
    }

    #[test]
    fn boxed_recognizer_delegates() {
        let boxed: Box<dyn TextRecognizer> = Box::new(MockRecognizer::new("via box"));
        assert_eq!(boxed.recognize(b"x").unwrap(), "via box");
    }
}
