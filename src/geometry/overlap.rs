//! Alignment-aware icon/text overlap resolution.
//!
//! Mirroring and text-length changes between languages can push icons into
//! text. Resolution must not break intentional design grids: rows of text
//! shapes that shared a left edge in the pre-mirror layout. Members of such
//! a grid are only ever shrunk by the same amount; unequal shrinking of grid
//! members is a correctness bug even though it is locally valid for
//! free-standing shapes.
//!
//! Alignment groups are detected once, from the pre-mirror snapshot, and are
//! read-only afterward. Mirroring turns shared left edges into shared right
//! edges, so re-deriving groups from the mirrored layout would find nothing.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::audit::{AuditLog, Correction, CorrectionAction};
use crate::index::{ShapeClass, ShapeIndex, ShapeKey};
use crate::model::{Document, Frame, Shape};

/// Tunables for alignment detection and overlap resolution.
///
/// The tolerance and group-size defaults are empirical, tuned against a
/// sample deck family; treat them as knobs, not invariants.
#[derive(Debug, Clone)]
pub struct OverlapConfig {
    /// Maximum left-edge spread for shapes to count as aligned, in EMU
    pub alignment_tolerance: i64,
    /// Smallest cluster treated as an intentional grid
    pub min_group_size: usize,
    /// Gap kept between a relocated icon and the text it cleared, in EMU
    pub clearance: i64,
    /// Row membership: vertical-center distance must be under this fraction
    /// of the text shape's height
    pub row_factor: f64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            alignment_tolerance: 180_000,
            min_group_size: 3,
            clearance: 200_000,
            row_factor: 0.6,
        }
    }
}

impl OverlapConfig {
    pub fn with_alignment_tolerance(mut self, emu: i64) -> Self {
        self.alignment_tolerance = emu;
        self
    }

    pub fn with_min_group_size(mut self, size: usize) -> Self {
        self.min_group_size = size;
        self
    }

    pub fn with_clearance(mut self, emu: i64) -> Self {
        self.clearance = emu;
        self
    }

    pub fn with_row_factor(mut self, factor: f64) -> Self {
        self.row_factor = factor;
        self
    }
}

/// Text shapes on one slide sharing a left edge in the pre-mirror layout.
#[derive(Debug, Clone)]
pub struct AlignmentGroup {
    pub slide: usize,
    pub members: Vec<ShapeKey>,
}

impl AlignmentGroup {
    pub fn contains(&self, key: &ShapeKey) -> bool {
        self.members.contains(key)
    }
}

/// Cluster text-shape left edges from the pre-mirror snapshot.
///
/// Left edges are sorted per slide and clustered greedily against the
/// cluster's first member; clusters reaching the configured size become
/// alignment groups.
pub fn detect_alignment_groups(
    original: &ShapeIndex,
    config: &OverlapConfig,
) -> Vec<AlignmentGroup> {
    let mut per_slide: BTreeMap<usize, Vec<(i64, ShapeKey)>> = BTreeMap::new();
    for record in original.records() {
        if record.key.cell.is_some() || !record.has_text() {
            continue;
        }
        if !matches!(record.class, ShapeClass::Text | ShapeClass::AutoShape) {
            continue;
        }
        if let Some(frame) = record.frame {
            per_slide
                .entry(record.key.slide)
                .or_default()
                .push((frame.left, record.key));
        }
    }

    let mut groups = Vec::new();
    for (slide, mut edges) in per_slide {
        edges.sort_unstable();
        let mut cluster: Vec<ShapeKey> = Vec::new();
        let mut anchor = 0i64;
        for (left, key) in edges {
            if cluster.is_empty() {
                anchor = left;
                cluster.push(key);
            } else if left - anchor <= config.alignment_tolerance {
                cluster.push(key);
            } else {
                flush_cluster(&mut groups, &mut cluster, slide, config.min_group_size);
                anchor = left;
                cluster.push(key);
            }
        }
        flush_cluster(&mut groups, &mut cluster, slide, config.min_group_size);
    }
    groups
}

fn flush_cluster(
    groups: &mut Vec<AlignmentGroup>,
    cluster: &mut Vec<ShapeKey>,
    slide: usize,
    min_size: usize,
) {
    if cluster.len() >= min_size {
        debug!(slide, members = cluster.len(), "alignment group detected");
        groups.push(AlignmentGroup {
            slide,
            members: std::mem::take(cluster),
        });
    } else {
        cluster.clear();
    }
}

fn same_row(text: &Frame, other: &Frame, factor: f64) -> bool {
    let limit = (text.height as f64 * factor) as i64;
    (text.v_center() - other.v_center()).abs() < limit
}

/// Resolve icon/text overlaps on the mirrored document.
///
/// Aligned text shapes prefer icon relocation; when the icon cannot clear
/// the text on-slide, the required shrink is collected and the maximum is
/// applied uniformly to the whole group. Free-standing overlaps shrink just
/// the affected text shape. A final sweep relocates any icon still sitting
/// on text, pinned to the slide's right edge when it would otherwise leave
/// the slide.
pub fn resolve_overlaps(
    doc: &mut Document,
    groups: &[AlignmentGroup],
    config: &OverlapConfig,
    audit: &mut AuditLog,
) {
    let slide_width = doc.slide_width;
    for (i, slide) in doc.slides.iter_mut().enumerate() {
        resolve_slide(i + 1, &mut slide.shapes, slide_width, groups, config, audit);
    }
}

struct Candidate {
    text: usize,
    icon: usize,
}

fn resolve_slide(
    slide_no: usize,
    shapes: &mut [Shape],
    slide_width: i64,
    groups: &[AlignmentGroup],
    config: &OverlapConfig,
    audit: &mut AuditLog,
) {
    let text_ids: Vec<usize> = shapes
        .iter()
        .enumerate()
        .filter(|(_, s)| s.has_text() && s.frame.is_some())
        .map(|(i, _)| i)
        .collect();
    let icon_ids: Vec<usize> = shapes
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_icon() && s.frame.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut candidates = Vec::new();
    for &t in &text_ids {
        for &ic in &icon_ids {
            let (Some(tf), Some(icf)) = (shapes[t].frame, shapes[ic].frame) else {
                continue;
            };
            if same_row(&tf, &icf, config.row_factor) && tf.h_overlap(&icf) > 0 {
                candidates.push(Candidate { text: t, icon: ic });
            }
        }
    }

    // Required shrink per alignment group, keyed by group position for a
    // deterministic application order.
    let mut group_shrink: BTreeMap<usize, i64> = BTreeMap::new();

    for cand in &candidates {
        let (Some(tf), Some(icf)) = (shapes[cand.text].frame, shapes[cand.icon].frame) else {
            continue;
        };
        // Earlier actions may already have separated this pair.
        if !same_row(&tf, &icf, config.row_factor) || tf.h_overlap(&icf) == 0 {
            continue;
        }
        let key = ShapeKey::shape(slide_no, shapes[cand.text].id);
        let group_idx = groups
            .iter()
            .position(|g| g.slide == slide_no && g.contains(&key));

        let shrink_needed = tf.right() - (icf.left - config.clearance);
        match group_idx {
            Some(gi) => {
                let target = tf.right() + config.clearance;
                if target + icf.width <= slide_width {
                    if let Some(frame) = shapes[cand.icon].frame.as_mut() {
                        frame.left = target;
                    }
                    audit.push(
                        Correction::new(
                            slide_no,
                            shapes[cand.icon].id,
                            &shapes[cand.icon].name,
                            CorrectionAction::IconMove,
                        )
                        .with_note(format!("cleared aligned text {key}")),
                    );
                } else if shrink_needed > 0 {
                    let entry = group_shrink.entry(gi).or_insert(0);
                    *entry = (*entry).max(shrink_needed);
                }
            }
            None => {
                if shrink_needed <= 0 {
                    continue;
                }
                if tf.width - shrink_needed > 0 {
                    if let Some(frame) = shapes[cand.text].frame.as_mut() {
                        frame.width -= shrink_needed;
                    }
                    audit.push(
                        Correction::new(
                            slide_no,
                            shapes[cand.text].id,
                            &shapes[cand.text].name,
                            CorrectionAction::IndividualShrink,
                        )
                        .with_note(format!("-{shrink_needed} EMU")),
                    );
                } else {
                    warn!(%key, shrink_needed, "shrink would leave no width; shape left as-is");
                }
            }
        }
    }

    // Uniform shrink: every member of an affected group loses the same
    // amount, keeping the grid's rhythm intact.
    for (gi, shrink) in group_shrink {
        let member_ids: HashSet<u32> = groups[gi].members.iter().map(|k| k.shape_id).collect();
        for shape in shapes.iter_mut() {
            if !member_ids.contains(&shape.id) {
                continue;
            }
            let id = shape.id;
            let name = shape.name.clone();
            match shape.frame.as_mut() {
                Some(frame) if frame.width - shrink > 0 => {
                    frame.width -= shrink;
                    audit.push(
                        Correction::new(slide_no, id, &name, CorrectionAction::UniformShrink)
                            .with_note(format!("-{shrink} EMU with group")),
                    );
                }
                _ => {
                    warn!(slide_no, shape_id = id, shrink, "uniform shrink skipped; would leave no width");
                }
            }
        }
    }

    // Final sweep: nothing about grouping — any icon still on text moves to
    // just past the rightmost conflicting text edge, or pins to the slide's
    // right edge when that is off-slide.
    for &ic in &icon_ids {
        let Some(icf) = shapes[ic].frame else { continue };
        let mut rightmost: Option<i64> = None;
        for &t in &text_ids {
            let Some(tf) = shapes[t].frame else { continue };
            if same_row(&tf, &icf, config.row_factor) && tf.h_overlap(&icf) > 0 {
                rightmost = Some(rightmost.map_or(tf.right(), |r| r.max(tf.right())));
            }
        }
        let Some(edge) = rightmost else { continue };
        let target = edge + config.clearance;
        let (target, action) = if target + icf.width > slide_width {
            (slide_width - icf.width, CorrectionAction::IconPin)
        } else {
            (target, CorrectionAction::IconMove)
        };
        if target == icf.left {
            continue;
        }
        if let Some(frame) = shapes[ic].frame.as_mut() {
            frame.left = target;
        }
        audit.push(
            Correction::new(slide_no, shapes[ic].id, &shapes[ic].name, action)
                .with_note("final sweep"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Frame, ShapeKind, Slide, TextFrame};
    use pretty_assertions::assert_eq;

    fn text(id: u32, left: i64, top: i64, width: i64, height: i64) -> Shape {
        Shape {
            id,
            name: format!("TextBox {id}"),
            kind: ShapeKind::TextBox(TextFrame::from_text("body")),
            frame: Some(Frame::new(left, top, width, height)),
            flip_h: false,
        }
    }

    fn icon(id: u32, left: i64, top: i64, width: i64, height: i64) -> Shape {
        Shape {
            id,
            name: format!("Picture {id}"),
            kind: ShapeKind::Picture,
            frame: Some(Frame::new(left, top, width, height)),
            flip_h: false,
        }
    }

    fn doc(width: i64, shapes: Vec<Shape>) -> Document {
        Document {
            slide_width: width,
            slide_height: 6_858_000,
            slides: vec![Slide { shapes }],
        }
    }

    fn width_of(doc: &Document, id: u32) -> i64 {
        doc.shape(1, id).unwrap().frame.unwrap().width
    }

    fn left_of(doc: &Document, id: u32) -> i64 {
        doc.shape(1, id).unwrap().frame.unwrap().left
    }

    #[test]
    fn test_left_edges_within_tolerance_form_one_group() {
        let d = doc(
            9_144_000,
            vec![
                text(1, 100_000, 0, 500_000, 300_000),
                text(2, 102_000, 400_000, 500_000, 300_000),
                text(3, 98_000, 800_000, 500_000, 300_000),
                text(4, 4_000_000, 0, 500_000, 300_000),
            ],
        );
        let index = ShapeIndex::build(&d);
        let groups = detect_alignment_groups(&index, &OverlapConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
        assert!(groups[0].contains(&ShapeKey::shape(1, 3)));
    }

    #[test]
    fn test_pairs_below_min_size_are_coincidence() {
        let d = doc(
            9_144_000,
            vec![
                text(1, 100_000, 0, 500_000, 300_000),
                text(2, 100_000, 400_000, 500_000, 300_000),
            ],
        );
        let index = ShapeIndex::build(&d);
        assert!(detect_alignment_groups(&index, &OverlapConfig::default()).is_empty());
    }

    #[test]
    fn test_icon_moves_right_when_room_remains() {
        let mut d = doc(
            9_144_000,
            vec![
                text(1, 100, 0, 2_000_000, 300_000),
                text(2, 100, 400_000, 2_000_000, 300_000),
                text(3, 100, 800_000, 2_000_000, 300_000),
                // overlaps text 1's row
                icon(9, 1_500_000, 0, 400_000, 300_000),
            ],
        );
        let groups = detect_alignment_groups(&ShapeIndex::build(&d), &OverlapConfig::default());
        let mut audit = AuditLog::new();
        resolve_overlaps(&mut d, &groups, &OverlapConfig::default(), &mut audit);

        // Text untouched, icon relocated past the text edge plus clearance
        assert_eq!(width_of(&d, 1), 2_000_000);
        assert_eq!(left_of(&d, 9), 100 + 2_000_000 + 200_000);
    }

    #[test]
    fn test_uniform_shrink_applies_to_every_member() {
        // Icons block two of the three rows and cannot move right on-slide
        let mut d = doc(
            3_000_000,
            vec![
                text(1, 100, 0, 2_500_000, 300_000),
                text(2, 100, 400_000, 2_500_000, 300_000),
                text(3, 100, 800_000, 2_500_000, 300_000),
                icon(8, 2_300_000, 0, 600_000, 300_000),
                icon(9, 2_300_000, 400_000, 600_000, 300_000),
            ],
        );
        let groups = detect_alignment_groups(&ShapeIndex::build(&d), &OverlapConfig::default());
        assert_eq!(groups.len(), 1);
        let mut audit = AuditLog::new();
        resolve_overlaps(&mut d, &groups, &OverlapConfig::default(), &mut audit);

        // All three members end with the same width, including the
        // never-overlapped one
        let w1 = width_of(&d, 1);
        assert_eq!(w1, width_of(&d, 2));
        assert_eq!(w1, width_of(&d, 3));
        assert!(w1 < 2_500_000);
    }

    #[test]
    fn test_free_standing_text_shrinks_alone() {
        let mut d = doc(
            3_000_000,
            vec![
                text(1, 100, 0, 2_500_000, 300_000),
                icon(9, 2_300_000, 0, 600_000, 300_000),
            ],
        );
        let mut audit = AuditLog::new();
        resolve_overlaps(&mut d, &[], &OverlapConfig::default(), &mut audit);

        // Shrunk to exactly clear the icon and its margin
        assert_eq!(width_of(&d, 1), 2_300_000 - 200_000 - 100);
        assert!(audit
            .corrections
            .iter()
            .any(|c| c.action == CorrectionAction::IndividualShrink));
    }

    #[test]
    fn test_sweep_pins_icon_to_slide_edge() {
        // Shrinking the text enough to clear the icon would leave it with no
        // width, so only the sweep can act, and it pins the icon on-slide
        let mut d = doc(
            3_000_000,
            vec![
                text(1, 2_000_000, 0, 900_000, 300_000),
                icon(9, 2_100_000, 0, 600_000, 300_000),
            ],
        );
        let mut audit = AuditLog::new();
        resolve_overlaps(&mut d, &[], &OverlapConfig::default(), &mut audit);

        let l = left_of(&d, 9);
        assert!(l + 600_000 <= 3_000_000);
        assert!(audit
            .corrections
            .iter()
            .any(|c| c.action == CorrectionAction::IconPin));
    }

    #[test]
    fn test_resolved_geometry_stays_on_slide() {
        let mut d = doc(
            3_000_000,
            vec![
                text(1, 100, 0, 2_500_000, 300_000),
                text(2, 100, 400_000, 2_500_000, 300_000),
                text(3, 100, 800_000, 2_500_000, 300_000),
                icon(8, 2_300_000, 0, 600_000, 300_000),
                icon(9, 100_000, 400_000, 600_000, 300_000),
            ],
        );
        let groups = detect_alignment_groups(&ShapeIndex::build(&d), &OverlapConfig::default());
        let mut audit = AuditLog::new();
        resolve_overlaps(&mut d, &groups, &OverlapConfig::default(), &mut audit);

        for shape in &d.slides[0].shapes {
            let f = shape.frame.unwrap();
            assert!(f.left >= 0, "shape {} off-slide left", shape.id);
            assert!(f.right() <= 3_000_000, "shape {} off-slide right", shape.id);
            assert!(f.width > 0);
        }
    }
}
