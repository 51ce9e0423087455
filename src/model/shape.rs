//! Shape tree types: slides, shapes, text frames, tables.

use serde::{Deserialize, Serialize};

use super::Rgb;

/// A presentation document: slide dimensions plus the slide list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Slide width in EMU, the mirroring container for top-level shapes
    pub slide_width: i64,
    pub slide_height: i64,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

/// Position and size of a shape in EMU, relative to its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Frame {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    /// Vertical center, used for row-membership tests
    pub fn v_center(&self) -> i64 {
        self.top + self.height / 2
    }

    /// Amount of horizontal overlap with another frame (zero when disjoint)
    pub fn h_overlap(&self, other: &Frame) -> i64 {
        (self.right().min(other.right()) - self.left.max(other.left)).max(0)
    }
}

/// A single shape in the tree.
///
/// `frame: None` models a shape whose geometry could not be read from the
/// source document; such shapes are still indexed but skipped by every
/// geometric pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// Shape identifier, stable across re-opens of the same document
    pub id: u32,
    /// Free-form name used by the icon/logo classification heuristics
    #[serde(default)]
    pub name: String,
    pub kind: ShapeKind,
    pub frame: Option<Frame>,
    /// Horizontal flip flag (DrawingML `flipH`)
    #[serde(default)]
    pub flip_h: bool,
}

/// Closed set of shape kinds the pipeline distinguishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeKind {
    TextBox(TextFrame),
    Picture,
    /// Auto-shapes may or may not carry text
    AutoShape(Option<TextFrame>),
    Table(Table),
    Group(Vec<Shape>),
}

impl Shape {
    /// The shape's text frame, if it has one.
    pub fn text_frame(&self) -> Option<&TextFrame> {
        match &self.kind {
            ShapeKind::TextBox(tf) => Some(tf),
            ShapeKind::AutoShape(tf) => tf.as_ref(),
            _ => None,
        }
    }

    pub fn text_frame_mut(&mut self) -> Option<&mut TextFrame> {
        match &mut self.kind {
            ShapeKind::TextBox(tf) => Some(tf),
            ShapeKind::AutoShape(tf) => tf.as_mut(),
            _ => None,
        }
    }

    /// True when the shape carries any non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.text_frame()
            .map(|tf| !tf.text().trim().is_empty())
            .unwrap_or(false)
    }

    /// Picture or textless auto-shape: an icon candidate for the resolver.
    pub fn is_icon(&self) -> bool {
        match &self.kind {
            ShapeKind::Picture => true,
            ShapeKind::AutoShape(_) => !self.has_text(),
            _ => false,
        }
    }
}

/// Paragraph alignment, restricted to what RTL enforcement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    /// Single-paragraph, single-run frame.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph {
                runs: vec![Run {
                    text: text.into(),
                    ..Run::default()
                }],
                ..Paragraph::default()
            }],
        }
    }

    /// Concatenation of all run text, paragraphs joined with newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.runs.iter().map(|r| r.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.paragraphs.iter().flat_map(|p| p.runs.iter())
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// DrawingML `a:pPr @rtl` equivalent
    #[serde(default)]
    pub rtl: bool,
    #[serde(default)]
    pub align: Alignment,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub color: Option<Rgb>,
    pub font: Option<String>,
    pub size_pt: Option<f32>,
}

/// A table shape: cells stored row-major, each an independent text frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<TextFrame>,
}

impl Table {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![TextFrame::default(); rows * cols],
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TextFrame> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TextFrame> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }
}

impl Document {
    /// Find a shape anywhere in a slide's tree by its id.
    pub fn shape_mut(&mut self, slide: usize, shape_id: u32) -> Option<&mut Shape> {
        let slide = self.slides.get_mut(slide.checked_sub(1)?)?;
        find_shape_mut(&mut slide.shapes, shape_id)
    }

    pub fn shape(&self, slide: usize, shape_id: u32) -> Option<&Shape> {
        let slide = self.slides.get(slide.checked_sub(1)?)?;
        find_shape(&slide.shapes, shape_id)
    }
}

fn find_shape_mut(shapes: &mut [Shape], id: u32) -> Option<&mut Shape> {
    for shape in shapes {
        if shape.id == id {
            return Some(shape);
        }
        if let ShapeKind::Group(children) = &mut shape.kind {
            if let Some(found) = find_shape_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_shape(shapes: &[Shape], id: u32) -> Option<&Shape> {
    for shape in shapes {
        if shape.id == id {
            return Some(shape);
        }
        if let ShapeKind::Group(children) = &shape.kind {
            if let Some(found) = find_shape(children, id) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_shape(id: u32, text: &str) -> Shape {
        Shape {
            id,
            name: format!("TextBox {id}"),
            kind: ShapeKind::TextBox(TextFrame::from_text(text)),
            frame: Some(Frame::new(0, 0, 100, 50)),
            flip_h: false,
        }
    }

    #[test]
    fn test_text_concatenation() {
        let mut tf = TextFrame::from_text("hello");
        tf.paragraphs.push(Paragraph {
            runs: vec![
                Run {
                    text: "wo".into(),
                    ..Run::default()
                },
                Run {
                    text: "rld".into(),
                    ..Run::default()
                },
            ],
            ..Paragraph::default()
        });
        assert_eq!(tf.text(), "hello\nworld");
    }

    #[test]
    fn test_icon_classification() {
        let pic = Shape {
            id: 1,
            name: "arrow-right".into(),
            kind: ShapeKind::Picture,
            frame: None,
            flip_h: false,
        };
        assert!(pic.is_icon());

        let labeled = Shape {
            id: 2,
            name: "callout".into(),
            kind: ShapeKind::AutoShape(Some(TextFrame::from_text("label"))),
            frame: None,
            flip_h: false,
        };
        assert!(!labeled.is_icon());
        assert!(!text_shape(3, "x").is_icon());
    }

    #[test]
    fn test_shape_lookup_recurses_into_groups() {
        let doc = Document {
            slide_width: 1000,
            slide_height: 800,
            slides: vec![Slide {
                shapes: vec![Shape {
                    id: 10,
                    name: "Group".into(),
                    kind: ShapeKind::Group(vec![text_shape(11, "inner")]),
                    frame: Some(Frame::new(0, 0, 500, 500)),
                    flip_h: false,
                }],
            }],
        };
        assert!(doc.shape(1, 11).is_some());
        assert!(doc.shape(1, 99).is_none());
        assert!(doc.shape(2, 11).is_none());
    }

    #[test]
    fn test_table_cell_addressing() {
        let mut table = Table::new(2, 3);
        *table.cell_mut(1, 2).unwrap() = TextFrame::from_text("corner");
        assert_eq!(table.cell(1, 2).unwrap().text(), "corner");
        assert!(table.cell(2, 0).is_none());
        assert!(table.cell(0, 3).is_none());
    }

    #[test]
    fn test_frame_h_overlap() {
        let a = Frame::new(0, 0, 100, 50);
        let b = Frame::new(80, 0, 100, 50);
        let c = Frame::new(200, 0, 50, 50);
        assert_eq!(a.h_overlap(&b), 20);
        assert_eq!(a.h_overlap(&c), 0);
    }
}
