//! OCR-based readability check.
//!
//! An optional end-to-end validation: render the finished deck and confirm
//! that each slide still carries recognizable text. Recognition is an
//! external collaborator behind `TextRecognizer`; a failed call skips that
//! slide's check rather than failing the run.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR tool '{0}' not found on PATH")]
    ToolMissing(String),
    #[error("OCR subprocess I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("OCR subprocess exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("failed to encode raster for OCR: {0}")]
    Encode(#[from] image::ImageError),
}

/// Recognized text for one raster with a mean word confidence in 0..100.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub text: String,
    pub confidence: f64,
}

pub trait TextRecognizer {
    fn recognize(&self, raster: &RgbImage) -> Result<Recognition, OcrError>;
}

/// Per-slide readability verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideReadability {
    pub slide: usize,
    pub chars: usize,
    pub confidence: f64,
    pub readable: bool,
}

/// Machine-readable readability report, written as JSON when requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrReport {
    pub slides: Vec<SlideReadability>,
    pub all_readable: bool,
}

/// A slide reads as legible when recognition is confident and produced a
/// non-trivial amount of text.
const MIN_CONFIDENCE: f64 = 60.0;
const MIN_CHARS: usize = 20;

pub fn readability_report(
    rasters: &[RgbImage],
    recognizer: &dyn TextRecognizer,
) -> OcrReport {
    let mut slides = Vec::with_capacity(rasters.len());
    for (i, raster) in rasters.iter().enumerate() {
        let slide = i + 1;
        match recognizer.recognize(raster) {
            Ok(rec) => {
                let chars = rec.text.chars().filter(|c| !c.is_whitespace()).count();
                slides.push(SlideReadability {
                    slide,
                    chars,
                    confidence: rec.confidence,
                    readable: rec.confidence > MIN_CONFIDENCE && chars > MIN_CHARS,
                });
            }
            Err(err) => {
                warn!(slide, %err, "OCR failed; slide marked unreadable");
                slides.push(SlideReadability {
                    slide,
                    chars: 0,
                    confidence: 0.0,
                    readable: false,
                });
            }
        }
    }
    let all_readable = !slides.is_empty() && slides.iter().all(|s| s.readable);
    OcrReport {
        slides,
        all_readable,
    }
}

/// Recognizer backed by the `tesseract` CLI in TSV mode.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    pub tesseract: PathBuf,
    /// Language code passed to `-l`, e.g. `ara`
    pub lang: String,
}

impl TesseractRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            lang: lang.into(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, raster: &RgbImage) -> Result<Recognition, OcrError> {
        let dir = tempfile::tempdir()?;
        let png = dir.path().join("region.png");
        raster.save(&png)?;

        let output = Command::new(&self.tesseract)
            .arg(&png)
            .arg("stdout")
            .args(["-l", &self.lang, "tsv"])
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    OcrError::ToolMissing(self.tesseract.to_string_lossy().into_owned())
                } else {
                    OcrError::Io(e)
                }
            })?;
        if !output.status.success() {
            return Err(OcrError::Failed(output.status));
        }
        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv))
    }
}

/// Pull recognized words and their confidences out of tesseract TSV output.
/// Word rows carry `conf >= 0`; structural rows use `-1`.
fn parse_tsv(tsv: &str) -> Recognition {
    let mut words = Vec::new();
    let mut confidences = Vec::new();
    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let conf: f64 = match cols[10].parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let word = cols[11].trim();
        if conf >= 0.0 && !word.is_empty() {
            words.push(word.to_string());
            confidences.push(conf);
        }
    }
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };
    Recognition {
        text: words.join(" "),
        confidence,
    }
}
