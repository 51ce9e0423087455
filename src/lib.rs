//! deckmirror - geometry-preserving RTL localization for presentation decks
//!
//! Converts a left-to-right deck into a right-to-left one while preserving
//! visual fidelity: shape geometry mirrors across its actual positioning
//! container, icon/text overlaps introduced by mirroring are resolved
//! without breaking intentional alignment grids, and text contrast is
//! corrected from rendered pixels rather than declared colors. A bounded
//! validation/recovery loop guarantees no translated text is silently lost.
//!
//! The deck itself is an in-memory [`model::Document`]; loading and saving
//! a concrete presentation format is a front-end concern. The CLI works on
//! a JSON rendition of the model.
//!
//! # Example
//!
//! ```rust
//! use deckmirror::model::{Document, Slide};
//! use deckmirror::geometry::mirror_document;
//!
//! let mut doc = Document {
//!     slide_width: 9_144_000,
//!     slide_height: 6_858_000,
//!     slides: vec![Slide { shapes: vec![] }],
//! };
//! mirror_document(&mut doc);
//! ```

pub mod audit;
pub mod contrast;
pub mod geometry;
pub mod index;
pub mod model;
pub mod ocr;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod text;
pub mod translate;

pub use audit::{AuditLog, Correction, CorrectionAction};
pub use contrast::{contrast_ratio, ContrastConfig, ContrastError};
pub use geometry::{AlignmentGroup, OverlapConfig};
pub use index::{ShapeIndex, ShapeKey};
pub use model::Document;
pub use palette::{BrandPalette, PaletteError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOutcome};
pub use render::{RenderError, SlideRenderer, SofficeRenderer};
pub use translate::{TranslateError, TranslationMap};

use std::path::Path;

use thiserror::Error;

/// Errors that can end a run; everything else degrades and logs.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read or write deck JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Contrast(#[from] ContrastError),
}

/// Read a deck from its JSON rendition.
pub fn load_document(path: &Path) -> Result<Document, DeckError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a deck back to JSON.
pub fn save_document(doc: &Document, path: &Path) -> Result<(), DeckError> {
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json)?;
    Ok(())
}
