//! OCR wrapper.
//!
//! The project relies on `ocr-rs` (Rust PaddleOCR bindings). OCR engines are
//! sensitive to input quality, so every crop is upscaled and run through a
//! few binarization candidates; the most plausible read wins.

use std::path::Path;

use anyhow::Context;

use crate::{Image, OwnedImage, RecognitionError};

/// Anything that can turn a crop into lines of text.
pub trait TextRecognizer {
    fn recognize(&self, image: Image) -> Result<Vec<String>, RecognitionError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn recognize(&self, image: Image) -> Result<Vec<String>, RecognitionError> {
        (**self).recognize(image)
    }
}

/// Crops lower than this are upscaled before recognition.
const MIN_HEIGHT: u32 = 80;

pub struct Ocr {
    engine: ocr_rs::OcrEngine,
}

impl Ocr {
    /// Initialize the OCR engine with the given model paths.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charset: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| i32::try_from(n.get()).unwrap_or(i32::MAX))
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection.as_ref(),
            recognition.as_ref(),
            charset.as_ref(),
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count,
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine")?;

        Ok(Self { engine })
    }

    fn run(&self, image: Image) -> Result<Vec<String>, RecognitionError> {
        let input = ocr_rs::preprocess::rgb_to_image(&image.get_bytes(), image.width(), image.height());
        let results = self
            .engine
            .recognize(&input)
            .map_err(|err| RecognitionError::Engine(err.to_string()))?;
        Ok(results.into_iter().map(|v| v.text).collect())
    }
}

impl TextRecognizer for Ocr {
    fn recognize(&self, image: Image) -> Result<Vec<String>, RecognitionError> {
        let mut best: Option<(i64, Vec<String>)> = None;
        let mut last_err = None;

        for candidate in candidates(image) {
            match self.run(candidate.as_image()) {
                Ok(lines) => {
                    let score = score_text(&lines);
                    if best.as_ref().is_none_or(|(s, _)| score > *s) {
                        best = Some((score, lines));
                    }
                }
                Err(err) => {
                    tracing::debug!(%err, "ocr candidate failed");
                    last_err = Some(err);
                }
            }
        }

        let lines = match (best, last_err) {
            (Some((_, lines)), _) => lines,
            (None, Some(err)) => return Err(err),
            (None, None) => Vec::new(),
        };

        if std::env::var("ECHOSORT_WRITE_IMAGE").as_deref() == Ok("1") {
            write_snapshot(image, &lines);
        }

        Ok(lines)
    }
}

/// Raw (upscaled), adaptive threshold and Otsu threshold renditions of a crop.
fn candidates(image: Image) -> Vec<OwnedImage> {
    use imageproc::contrast::{ThresholdType, adaptive_threshold, equalize_histogram, otsu_level, threshold};

    let mut base = image.to_owned_image();
    if base.height() < MIN_HEIGHT
        && let Err(err) = base.resize_h(MIN_HEIGHT)
    {
        tracing::debug!(%err, "ocr upscale failed, using the crop as is");
    }

    let gray = equalize_histogram(&base.to_gray_image());
    let adaptive = OwnedImage::from_gray_as_rgb(&dark_text_on_light(adaptive_threshold(&gray, 7, 10)));
    let level = otsu_level(&gray);
    let otsu = OwnedImage::from_gray_as_rgb(&dark_text_on_light(threshold(&gray, level, ThresholdType::Binary)));

    vec![base, adaptive, otsu]
}

/// Invert a binarized image when it is mostly dark, so the background ends up light.
fn dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
    let white = bin.pixels().filter(|p| p.0[0] > 0).count();
    let black = (bin.width() * bin.height()) as usize - white;
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
    }
    bin
}

/// Prefer reads with more alphanumerics (less noise) and slightly longer length.
fn score_text(lines: &[String]) -> i64 {
    lines
        .iter()
        .flat_map(|line| line.chars())
        .map(|ch| {
            if ch.is_alphanumeric() {
                4
            } else if ch.is_whitespace() {
                0
            } else {
                1
            }
        })
        .sum()
}

fn write_snapshot(image: Image, lines: &[String]) {
    let name = lines
        .concat()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(40)
        .collect::<String>();
    let path = format!("./debug_ocr_{name}.png");
    if let Err(err) = image.save_png(&path) {
        tracing::debug!(%err, path = %path, "failed to write ocr snapshot");
    }
}
