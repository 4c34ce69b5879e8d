use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use packtrace_core::{PreprocessConfig, VariantKind};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode variant bitmap: {0}")]
    Encode(String),
}

/// Decode uploaded bytes (JPEG / PNG / WEBP / …). Undecodable input is a
/// fatal input error, surfaced before any recognizer call.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    Ok(image::load_from_memory(data)?)
}

/// One derived bitmap plus the transform that produced it.
pub struct PreprocessVariant {
    pub kind: VariantKind,
    /// PNG-encoded derived bitmap, ready for the recognizer.
    pub png: Vec<u8>,
}

/// Derive the configured variant sequence from one source image.
/// Finite, non-empty for any non-empty variant list, ordered as configured,
/// and deterministic for a given image. The source image is never mutated.
///
/// Dot-matrix codes need heavy dilation to fuse disconnected dots into
/// glyphs the recognizer can read, but that same dilation destroys small
/// printed dates — which is why several transforms run instead of one.
pub fn preprocess(
    img: &DynamicImage,
    cfg: &PreprocessConfig,
) -> Result<Vec<PreprocessVariant>, PreprocessError> {
    let gray = downscale(img, cfg.max_dimension).to_luma8();
    let stretched = contrast_stretch(&gray);

    cfg.variants
        .iter()
        .map(|&kind| {
            let bitmap = match kind {
                VariantKind::Grayscale => stretched.clone(),
                VariantKind::Threshold => binarize(&stretched, cfg.threshold),
                VariantKind::DilateLight => {
                    dilate(&binarize(&stretched, cfg.threshold), cfg.dilate_kernel, 1)
                }
                VariantKind::DilateHeavy => {
                    dilate(&binarize(&stretched, cfg.threshold), cfg.dilate_kernel, 2)
                }
            };
            Ok(PreprocessVariant { kind, png: encode_png(bitmap)? })
        })
        .collect()
}

/// Recognizers behave best under ~300 DPI; very large photos are scaled down.
fn downscale(img: &DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
    } else {
        img.clone()
    }
}

/// Stretch pixel values to the full 0–255 range.
fn contrast_stretch(gray: &GrayImage) -> GrayImage {
    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        // Uniform image — nothing to stretch.
        return gray.clone();
    }

    let range = (max_px - min_px) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        let v = ((p - min_px) as u32 * 255 / range) as u8;
        Luma([v])
    })
}

/// Fixed-cutoff binarization: luminance above the cutoff becomes white,
/// everything else black.
fn binarize(gray: &GrayImage, cutoff: u8) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y)[0] > cutoff { 255 } else { 0 }])
    })
}

/// Morphological dilation with a square structuring element: each output
/// pixel is the window maximum, so white regions grow by up to the kernel
/// size per iteration.
fn dilate(src: &GrayImage, kernel: u32, iterations: u32) -> GrayImage {
    let half = kernel / 2;
    let mut out = src.clone();
    for _ in 0..iterations {
        let prev = out;
        out = ImageBuffer::from_fn(prev.width(), prev.height(), |x, y| {
            let x0 = x.saturating_sub(half);
            let y0 = y.saturating_sub(half);
            let x1 = (x + kernel - half).min(prev.width());
            let y1 = (y + kernel - half).min(prev.height());
            let mut max = 0u8;
            for yy in y0..y1 {
                for xx in x0..x1 {
                    max = max.max(prev.get_pixel(xx, yy)[0]);
                }
            }
            Luma([max])
        });
    }
    out
}

fn encode_png(img: GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
