//! Flat shape registry built from the shape tree.
//!
//! The index is the pipeline's unit of comparison: one is snapshotted from
//! the pristine document and kept immutable as ground truth, and the working
//! index is rebuilt wholesale after every stage that mutates the document.
//! Records are keyed by a stable identity path so the same shape can be
//! matched across snapshots taken at different pipeline stages.

mod classify;

pub use classify::{is_directional, is_logo_like};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::model::{Document, Frame, Shape, ShapeKind};

/// Stable identity path for a shape or table cell.
///
/// String form is `slide-<n>:shape-<id>` with an optional
/// `:table:r<row>c<col>` suffix; slide numbers are 1-based, row/col 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey {
    pub slide: usize,
    pub shape_id: u32,
    pub cell: Option<(usize, usize)>,
}

impl ShapeKey {
    pub fn shape(slide: usize, shape_id: u32) -> Self {
        Self {
            slide,
            shape_id,
            cell: None,
        }
    }

    pub fn table_cell(slide: usize, shape_id: u32, row: usize, col: usize) -> Self {
        Self {
            slide,
            shape_id,
            cell: Some((row, col)),
        }
    }

    /// The key of the shape itself, stripping any cell suffix.
    pub fn parent(&self) -> ShapeKey {
        ShapeKey::shape(self.slide, self.shape_id)
    }
}

// Display is the wire format used by translation maps and reports.
impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide-{}:shape-{}", self.slide, self.shape_id)?;
        if let Some((r, c)) = self.cell {
            write!(f, ":table:r{}c{}", r, c)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("malformed shape key '{0}'")]
pub struct KeyParseError(String);

impl FromStr for ShapeKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());
        let mut parts = s.split(':');
        let slide = parts
            .next()
            .and_then(|p| p.strip_prefix("slide-"))
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(err)?;
        let shape_id = parts
            .next()
            .and_then(|p| p.strip_prefix("shape-"))
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(err)?;
        let cell = match (parts.next(), parts.next()) {
            (None, _) => None,
            (Some("table"), Some(rc)) => {
                let rc = rc.strip_prefix('r').ok_or_else(err)?;
                let (row, col) = rc.split_once('c').ok_or_else(err)?;
                Some((
                    row.parse().map_err(|_| err())?,
                    col.parse().map_err(|_| err())?,
                ))
            }
            _ => return Err(err()),
        };
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(ShapeKey {
            slide,
            shape_id,
            cell,
        })
    }
}

/// Semantic kind of an indexed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeClass {
    Text,
    Picture,
    AutoShape,
    Table,
    Group,
}

/// One indexed shape (or table cell) with the geometry context needed for
/// mirroring: the width of the container it is positioned relative to.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    pub key: ShapeKey,
    pub name: String,
    pub class: ShapeClass,
    /// `None` when the source shape had no readable geometry
    pub frame: Option<Frame>,
    /// Width of the immediate positioning container: the slide for top-level
    /// shapes, the owning group's own width for group children
    pub container_width: i64,
    pub text: Option<String>,
}

impl ShapeRecord {
    pub fn has_text(&self) -> bool {
        self.text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Flat registry of shape records in deterministic traversal order.
#[derive(Debug, Clone, Default)]
pub struct ShapeIndex {
    records: Vec<ShapeRecord>,
    by_key: HashMap<ShapeKey, usize>,
}

impl ShapeIndex {
    /// Build the index by depth-first traversal, siblings in document order.
    ///
    /// Never aborts on a malformed shape: a shape without geometry is still
    /// indexed (with `frame: None`) and logged.
    pub fn build(doc: &Document) -> ShapeIndex {
        let mut index = ShapeIndex::default();
        for (i, slide) in doc.slides.iter().enumerate() {
            let slide_no = i + 1;
            for shape in &slide.shapes {
                index.visit(shape, slide_no, doc.slide_width);
            }
        }
        index
    }

    fn visit(&mut self, shape: &Shape, slide: usize, container_width: i64) {
        let key = ShapeKey::shape(slide, shape.id);
        if shape.frame.is_none() {
            warn!(%key, name = %shape.name, "shape has no readable geometry; indexed without frame");
        }
        let (class, text) = match &shape.kind {
            ShapeKind::TextBox(tf) => (ShapeClass::Text, Some(tf.text())),
            ShapeKind::Picture => (ShapeClass::Picture, None),
            ShapeKind::AutoShape(tf) => (ShapeClass::AutoShape, tf.as_ref().map(|t| t.text())),
            ShapeKind::Table(_) => (ShapeClass::Table, None),
            ShapeKind::Group(_) => (ShapeClass::Group, None),
        };
        self.push(ShapeRecord {
            key,
            name: shape.name.clone(),
            class,
            frame: shape.frame,
            container_width,
            text,
        });

        match &shape.kind {
            ShapeKind::Table(table) => {
                for row in 0..table.rows {
                    for col in 0..table.cols {
                        if let Some(cell) = table.cell(row, col) {
                            self.push(ShapeRecord {
                                key: ShapeKey::table_cell(slide, shape.id, row, col),
                                name: shape.name.clone(),
                                class: ShapeClass::Text,
                                frame: None,
                                container_width,
                                text: Some(cell.text()),
                            });
                        }
                    }
                }
            }
            ShapeKind::Group(children) => {
                // Children are positioned relative to the group, so they
                // mirror against the group's width, not the slide's.
                let group_width = shape
                    .frame
                    .map(|f| f.width)
                    .unwrap_or(container_width);
                for child in children {
                    self.visit(child, slide, group_width);
                }
            }
            _ => {}
        }
    }

    fn push(&mut self, record: ShapeRecord) {
        self.by_key.insert(record.key, self.records.len());
        self.records.push(record);
    }

    pub fn get(&self, key: &ShapeKey) -> Option<&ShapeRecord> {
        self.by_key.get(key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, key: &ShapeKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Records in traversal order.
    pub fn records(&self) -> &[ShapeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys of all text-bearing records (shapes and table cells).
    pub fn text_keys(&self) -> impl Iterator<Item = ShapeKey> + '_ {
        self.records
            .iter()
            .filter(|r| r.text.is_some())
            .map(|r| r.key)
    }
}
