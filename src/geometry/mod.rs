//! Geometry passes: horizontal mirroring and overlap resolution.

pub mod mirror;
pub mod overlap;

pub use mirror::{flip_directional_icons, mirror_document, mirrored_left};
pub use overlap::{detect_alignment_groups, resolve_overlaps, AlignmentGroup, OverlapConfig};
