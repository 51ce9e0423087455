//! Horizontal mirroring of shape geometry.
//!
//! Each shape mirrors against the width of the container it is positioned
//! relative to: the slide for top-level shapes, the owning group's own width
//! for group children. Children must mirror before their group does, since
//! mirroring the container first would leave the already-relative child
//! coordinates interpreted against the wrong frame.

use tracing::warn;

use crate::audit::{AuditLog, Correction, CorrectionAction};
use crate::index::{is_directional, is_logo_like};
use crate::model::{Document, Shape, ShapeKind};

/// The mirrored left edge. Integer-only; applying twice restores `left`.
pub fn mirrored_left(left: i64, width: i64, container_width: i64) -> i64 {
    container_width - (left + width)
}

/// Mirror every shape in the document across its container's width.
pub fn mirror_document(doc: &mut Document) {
    let slide_width = doc.slide_width;
    for (i, slide) in doc.slides.iter_mut().enumerate() {
        for shape in &mut slide.shapes {
            mirror_shape(shape, slide_width, i + 1);
        }
    }
}

fn mirror_shape(shape: &mut Shape, container_width: i64, slide: usize) {
    // Children first, against the group's own width.
    if let ShapeKind::Group(children) = &mut shape.kind {
        match shape.frame {
            Some(frame) => {
                for child in children {
                    mirror_shape(child, frame.width, slide);
                }
            }
            None => {
                warn!(slide, shape_id = shape.id, "group without geometry; children not mirrored");
                return;
            }
        }
    }
    match &mut shape.frame {
        Some(frame) => {
            frame.left = mirrored_left(frame.left, frame.width, container_width);
        }
        None => {
            warn!(slide, shape_id = shape.id, name = %shape.name, "shape without geometry skipped by mirror");
        }
    }
}

/// Set the horizontal flip flag on directional icons, skipping brand marks.
/// Setting an already-set flag is a no-op, so the pass is idempotent.
pub fn flip_directional_icons(doc: &mut Document, audit: &mut AuditLog) {
    for (i, slide) in doc.slides.iter_mut().enumerate() {
        for shape in &mut slide.shapes {
            flip_shape(shape, i + 1, audit);
        }
    }
}

fn flip_shape(shape: &mut Shape, slide: usize, audit: &mut AuditLog) {
    if let ShapeKind::Group(children) = &mut shape.kind {
        for child in children {
            flip_shape(child, slide, audit);
        }
        return;
    }
    let flippable = matches!(shape.kind, ShapeKind::Picture | ShapeKind::AutoShape(_));
    if flippable && !is_logo_like(&shape.name) && is_directional(&shape.name) && !shape.flip_h {
        shape.flip_h = true;
        audit.push(
            Correction::new(slide, shape.id, &shape.name, CorrectionAction::IconFlip)
                .with_note("directional icon"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frame, Slide, TextFrame};
    use pretty_assertions::assert_eq;

    fn doc_with(shapes: Vec<Shape>) -> Document {
        Document {
            slide_width: 1000,
            slide_height: 800,
            slides: vec![Slide { shapes }],
        }
    }

    fn shape(id: u32, name: &str, kind: ShapeKind, frame: Option<Frame>) -> Shape {
        Shape {
            id,
            name: name.into(),
            kind,
            frame,
            flip_h: false,
        }
    }

    #[test]
    fn test_mirrored_left_formula() {
        assert_eq!(mirrored_left(100, 50, 1000), 850);
        assert_eq!(mirrored_left(0, 1000, 1000), 0);
        // Off-slide inputs stay representable: arithmetic is plain i64
        assert_eq!(mirrored_left(-10, 50, 1000), 960);
    }

    #[test]
    fn test_mirror_is_involution() {
        for (left, width, cw) in [(100, 50, 1000), (0, 0, 7), (333, 334, 1000), (-5, 10, 99)] {
            let once = mirrored_left(left, width, cw);
            assert_eq!(mirrored_left(once, width, cw), left);
        }
    }

    #[test]
    fn test_group_children_mirror_against_group_width() {
        let child = shape(
            2,
            "inner",
            ShapeKind::TextBox(TextFrame::from_text("x")),
            Some(Frame::new(10, 0, 100, 50)),
        );
        let group = shape(
            1,
            "Group",
            ShapeKind::Group(vec![child]),
            Some(Frame::new(200, 0, 400, 300)),
        );
        let mut doc = doc_with(vec![group]);
        mirror_document(&mut doc);

        let group = &doc.slides[0].shapes[0];
        // Group mirrored against the slide width
        assert_eq!(group.frame.unwrap().left, 1000 - (200 + 400));
        // Child mirrored against the group width
        if let ShapeKind::Group(children) = &group.kind {
            assert_eq!(children[0].frame.unwrap().left, 400 - (10 + 100));
        } else {
            panic!("group lost its children");
        }
    }

    #[test]
    fn test_document_mirror_round_trips() {
        let original = doc_with(vec![
            shape(
                1,
                "a",
                ShapeKind::TextBox(TextFrame::from_text("t")),
                Some(Frame::new(123, 7, 456, 89)),
            ),
            shape(2, "b", ShapeKind::Picture, Some(Frame::new(700, 0, 100, 100))),
        ]);
        let mut doc = original.clone();
        mirror_document(&mut doc);
        mirror_document(&mut doc);
        for (a, b) in original.slides[0].shapes.iter().zip(&doc.slides[0].shapes) {
            assert_eq!(a.frame, b.frame);
        }
    }

    #[test]
    fn test_shape_without_geometry_is_skipped() {
        let mut doc = doc_with(vec![shape(1, "broken", ShapeKind::Picture, None)]);
        mirror_document(&mut doc);
        assert!(doc.slides[0].shapes[0].frame.is_none());
    }

    #[test]
    fn test_flip_directional_skips_logos() {
        let mut doc = doc_with(vec![
            shape(1, "Arrow 1", ShapeKind::Picture, Some(Frame::new(0, 0, 10, 10))),
            shape(2, "brand arrow", ShapeKind::Picture, Some(Frame::new(0, 0, 10, 10))),
            shape(3, "Rectangle", ShapeKind::Picture, Some(Frame::new(0, 0, 10, 10))),
        ]);
        let mut audit = AuditLog::new();
        flip_directional_icons(&mut doc, &mut audit);
        assert!(doc.slides[0].shapes[0].flip_h);
        assert!(!doc.slides[0].shapes[1].flip_h);
        assert!(!doc.slides[0].shapes[2].flip_h);
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn test_flip_is_idempotent() {
        let mut doc = doc_with(vec![shape(
            1,
            "chevron",
            ShapeKind::Picture,
            Some(Frame::new(0, 0, 10, 10)),
        )]);
        let mut audit = AuditLog::new();
        flip_directional_icons(&mut doc, &mut audit);
        flip_directional_icons(&mut doc, &mut audit);
        assert!(doc.slides[0].shapes[0].flip_h);
        // The second pass records nothing
        assert_eq!(audit.len(), 1);
    }
}
