//! In-memory presentation document model.
//!
//! The crate operates on this model rather than on any concrete file format;
//! a format front-end populates it and serializes the result back. The model
//! is serde-enabled so a deck can round-trip through a JSON rendition, which
//! is what the CLI reads and writes.

mod color;
mod shape;

pub use color::{Rgb, RgbParseError};
pub use shape::{
    Alignment, Document, Frame, Paragraph, Run, Shape, ShapeKind, Slide, Table, TextFrame,
};

/// English Metric Units per inch, the positional unit of the document format.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per centimetre, handy for the layout heuristics.
pub const EMU_PER_CM: i64 = 360_000;
