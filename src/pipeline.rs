//! The transform pipeline and its validation/recovery state machine.
//!
//! `Snapshot → Transform → Validate → {Recover → Validate}* → Finalize`.
//! Validation checks structural parity and that no translated text was
//! lost; recovery re-injects lost text and loops back, bounded at three
//! attempts. Past the bound the machine clears the outstanding set, logs
//! it, and still delivers: data loss is a degraded outcome, not a failed
//! run.
//!
//! The original snapshot is taken once and never mutated; the working
//! snapshot is rebuilt wholesale after every mutating step rather than
//! patched, so stale geometry cannot leak between stages. Alignment groups
//! are detected from the original snapshot before any mutation, because
//! mirroring destroys the shared-left-edge signal they are built from.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, Correction, CorrectionAction};
use crate::geometry::{
    detect_alignment_groups, flip_directional_icons, mirror_document, resolve_overlaps,
    AlignmentGroup, OverlapConfig,
};
use crate::index::{ShapeIndex, ShapeKey};
use crate::model::{Document, Shape, ShapeKind, TextFrame};
use crate::text::{
    enforce_frame_rtl, enforce_table_rtl, reverse_table_columns, set_frame_text, TextOptions,
};
use crate::translate::{apply_translations, TranslationMap};

/// Recovery never loops more than this many times.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to persist stage snapshot: {0}")]
    Persist(#[from] std::io::Error),
    #[error("failed to serialize stage snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which passes run and how they are tuned.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mirror: bool,
    pub flip_icons: bool,
    pub reverse_tables: bool,
    /// Treat a shape-count mismatch between snapshots as text loss on every
    /// mapped key
    pub strict_parity: bool,
    pub text: TextOptions,
    pub overlap: OverlapConfig,
    /// When set, each stage writes its document snapshot here; a crash
    /// leaves the last completed stage on disk
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            flip_icons: true,
            reverse_tables: true,
            strict_parity: false,
            text: TextOptions::default(),
            overlap: OverlapConfig::default(),
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_mirror(mut self, on: bool) -> Self {
        self.mirror = on;
        self
    }

    pub fn with_flip_icons(mut self, on: bool) -> Self {
        self.flip_icons = on;
        self
    }

    pub fn with_reverse_tables(mut self, on: bool) -> Self {
        self.reverse_tables = on;
        self
    }

    pub fn with_strict_parity(mut self, on: bool) -> Self {
        self.strict_parity = on;
        self
    }

    pub fn with_text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapConfig) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.work_dir = Some(dir);
        self
    }
}

/// Machine states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Snapshot,
    Transform,
    Validate,
    Recover,
    Finalize,
}

/// What a run produced, degraded outcomes included.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub doc: Document,
    pub audit: AuditLog,
    pub recovery_attempts: u32,
    /// Mapped keys still missing or empty when the recovery bound was hit
    pub unresolved: Vec<ShapeKey>,
    pub alignment_groups: usize,
}

pub struct Pipeline {
    map: TranslationMap,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(map: TranslationMap, config: PipelineConfig) -> Self {
        Self { map, config }
    }

    /// Drive the state machine over `doc` to completion.
    pub fn run(&self, mut doc: Document) -> Result<PipelineOutcome, PipelineError> {
        let mut audit = AuditLog::new();
        let mut stage = Stage::Snapshot;
        let mut original = ShapeIndex::default();
        let mut groups: Vec<AlignmentGroup> = Vec::new();
        let mut attempts = 0u32;
        let mut unresolved = Vec::new();

        loop {
            match stage {
                Stage::Snapshot => {
                    original = ShapeIndex::build(&doc);
                    groups = detect_alignment_groups(&original, &self.config.overlap);
                    info!(
                        shapes = original.len(),
                        alignment_groups = groups.len(),
                        "snapshot taken"
                    );
                    stage = Stage::Transform;
                }
                Stage::Transform => {
                    let applied = apply_translations(&mut doc, &self.map, &self.config.text);
                    if self.config.reverse_tables {
                        reverse_document_tables(&mut doc);
                    }
                    enforce_document_rtl(&mut doc, &self.config.text);
                    if self.config.mirror {
                        mirror_document(&mut doc);
                    }
                    if self.config.flip_icons {
                        flip_directional_icons(&mut doc, &mut audit);
                    }
                    info!(translations = applied, "transform complete");
                    self.persist(&doc, "transform")?;
                    stage = Stage::Validate;
                }
                Stage::Validate => {
                    let current = ShapeIndex::build(&doc);
                    let missing = self.find_missing(&original, &current);
                    if missing.is_empty() {
                        stage = Stage::Finalize;
                    } else if attempts >= MAX_RECOVERY_ATTEMPTS {
                        // Accept the degraded result rather than fail the run
                        warn!(
                            outstanding = missing.len(),
                            attempts, "recovery bound reached; delivering degraded result"
                        );
                        unresolved = missing.into_iter().collect();
                        stage = Stage::Finalize;
                    } else {
                        debug!(missing = missing.len(), "validation failed");
                        stage = Stage::Recover;
                    }
                }
                Stage::Recover => {
                    attempts += 1;
                    let current = ShapeIndex::build(&doc);
                    let missing = self.find_missing(&original, &current);
                    info!(attempt = attempts, keys = missing.len(), "recovering lost text");
                    for key in &missing {
                        self.reinject(&mut doc, &original, key, &mut audit);
                    }
                    self.persist(&doc, &format!("recover-{attempts}"))?;
                    stage = Stage::Validate;
                }
                Stage::Finalize => {
                    resolve_overlaps(&mut doc, &groups, &self.config.overlap, &mut audit);
                    self.persist(&doc, "final")?;
                    return Ok(PipelineOutcome {
                        doc,
                        audit,
                        recovery_attempts: attempts,
                        unresolved,
                        alignment_groups: groups.len(),
                    });
                }
            }
        }
    }

    /// Mapped keys whose shape vanished or whose non-empty original text
    /// came out empty.
    fn find_missing(&self, original: &ShapeIndex, current: &ShapeIndex) -> BTreeSet<ShapeKey> {
        let mut missing = BTreeSet::new();
        if self.config.strict_parity && original.len() != current.len() {
            warn!(
                before = original.len(),
                after = current.len(),
                "shape count parity lost"
            );
            missing.extend(self.map.keys().copied());
            return missing;
        }
        for key in self.map.keys() {
            let Some(record) = current.get(key) else {
                missing.insert(*key);
                continue;
            };
            let originally_non_empty = original.get(key).map(|r| r.has_text()).unwrap_or(false);
            if originally_non_empty && !record.has_text() {
                missing.insert(*key);
            }
        }
        missing
    }

    /// Put text back into one frame: the translation when available, the
    /// original text otherwise. RTL is re-applied by the rewrite itself.
    fn reinject(
        &self,
        doc: &mut Document,
        original: &ShapeIndex,
        key: &ShapeKey,
        audit: &mut AuditLog,
    ) {
        let replacement = self
            .map
            .get(key)
            .map(str::to_string)
            .or_else(|| original.get(key).and_then(|r| r.text.clone()));
        let Some(text) = replacement.filter(|t| !t.trim().is_empty()) else {
            warn!(%key, "nothing to re-inject for key");
            return;
        };
        let name = doc
            .shape(key.slide, key.shape_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        match frame_mut_for_key(doc, key) {
            Some(frame) => {
                set_frame_text(frame, &text, &self.config.text);
                audit.push(
                    Correction::new(key.slide, key.shape_id, &name, CorrectionAction::TextReinjected)
                        .with_note(key.to_string()),
                );
            }
            None => warn!(%key, "shape for key not found; cannot re-inject"),
        }
    }

    fn persist(&self, doc: &Document, stage: &str) -> Result<(), PipelineError> {
        let Some(dir) = &self.config.work_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("stage-{stage}.json"));
        std::fs::write(&path, serde_json::to_vec_pretty(doc)?)?;
        debug!(path = %path.display(), "stage snapshot persisted");
        Ok(())
    }
}

fn frame_mut_for_key<'a>(doc: &'a mut Document, key: &ShapeKey) -> Option<&'a mut TextFrame> {
    let shape = doc.shape_mut(key.slide, key.shape_id)?;
    match key.cell {
        Some((row, col)) => match &mut shape.kind {
            ShapeKind::Table(table) => table.cell_mut(row, col),
            _ => None,
        },
        None => shape.text_frame_mut(),
    }
}

fn reverse_document_tables(doc: &mut Document) {
    for slide in &mut doc.slides {
        for shape in &mut slide.shapes {
            reverse_shape_tables(shape);
        }
    }
}

fn reverse_shape_tables(shape: &mut Shape) {
    match &mut shape.kind {
        ShapeKind::Table(table) => reverse_table_columns(table),
        ShapeKind::Group(children) => {
            for child in children {
                reverse_shape_tables(child);
            }
        }
        _ => {}
    }
}

fn enforce_document_rtl(doc: &mut Document, opts: &TextOptions) {
    for slide in &mut doc.slides {
        for shape in &mut slide.shapes {
            enforce_shape_rtl(shape, opts);
        }
    }
}

fn enforce_shape_rtl(shape: &mut Shape, opts: &TextOptions) {
    match &mut shape.kind {
        ShapeKind::Table(table) => enforce_table_rtl(table, opts),
        ShapeKind::Group(children) => {
            for child in children {
                enforce_shape_rtl(child, opts);
            }
        }
        _ => {
            if let Some(tf) = shape.text_frame_mut() {
                enforce_frame_rtl(tf, opts);
            }
        }
    }
}
