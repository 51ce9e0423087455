//! Translation map loading and application.
//!
//! The translation step itself is external; this crate consumes its output,
//! a JSON object mapping shape identity paths to translated strings. Two
//! policies guard against content loss: a key absent from the map leaves the
//! shape untouched, and an empty (or whitespace) value is dropped at load
//! time so no translation can erase existing text.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::index::{KeyParseError, ShapeIndex, ShapeKey};
use crate::model::{Document, Shape, ShapeKind};
use crate::text::{set_frame_text, TextOptions};

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("failed to read translation map: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse translation map JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Key(#[from] KeyParseError),
}

/// Key→string translations, filtered of empty values at load.
#[derive(Debug, Clone, Default)]
pub struct TranslationMap {
    entries: HashMap<ShapeKey, String>,
}

impl TranslationMap {
    pub fn from_file(path: &Path) -> Result<Self, TranslateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TranslateError> {
        let raw: BTreeMap<String, String> = serde_json::from_str(content)?;
        let mut entries = HashMap::new();
        for (k, v) in raw {
            let key: ShapeKey = k.parse()?;
            if v.trim().is_empty() {
                warn!(%key, "empty translation dropped; existing text is kept");
                continue;
            }
            entries.insert(key, v);
        }
        debug!(entries = entries.len(), "translation map loaded");
        Ok(Self { entries })
    }

    pub fn get(&self, key: &ShapeKey) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &ShapeKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Apply translations across the document; returns the number of frames
/// rewritten. Replacement preserves the first original run's color, font
/// and size and re-applies RTL enforcement to the touched frame.
pub fn apply_translations(
    doc: &mut Document,
    map: &TranslationMap,
    opts: &TextOptions,
) -> usize {
    let mut applied = 0;
    for (i, slide) in doc.slides.iter_mut().enumerate() {
        for shape in &mut slide.shapes {
            applied += apply_to_shape(shape, i + 1, map, opts);
        }
    }
    applied
}

fn apply_to_shape(
    shape: &mut Shape,
    slide: usize,
    map: &TranslationMap,
    opts: &TextOptions,
) -> usize {
    let mut applied = 0;
    let key = ShapeKey::shape(slide, shape.id);
    match &mut shape.kind {
        ShapeKind::Group(children) => {
            for child in children {
                applied += apply_to_shape(child, slide, map, opts);
            }
        }
        ShapeKind::Table(table) => {
            for row in 0..table.rows {
                for col in 0..table.cols {
                    let cell_key = ShapeKey::table_cell(slide, shape.id, row, col);
                    let Some(text) = map.get(&cell_key) else { continue };
                    if let Some(cell) = table.cell_mut(row, col) {
                        set_frame_text(cell, text, opts);
                        applied += 1;
                    }
                }
            }
        }
        _ => {
            if let Some(text) = map.get(&key) {
                match shape.text_frame_mut() {
                    Some(tf) => {
                        set_frame_text(tf, text, opts);
                        applied += 1;
                    }
                    None => {
                        warn!(%key, "translation targets a shape that cannot hold text");
                    }
                }
            }
        }
    }
    applied
}

/// Every text-bearing shape and table cell with its current text, keyed by
/// identity path. The starting point for an external translation pass.
pub fn dump_map(doc: &Document) -> BTreeMap<String, String> {
    ShapeIndex::build(doc)
        .records()
        .iter()
        .filter_map(|r| {
            r.text
                .as_ref()
                .map(|t| (r.key.to_string(), t.clone()))
        })
        .collect()
}
