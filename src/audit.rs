//! Append-only audit log of corrective actions.
//!
//! Every geometric or color correction the pipeline applies is recorded here
//! and written out once at the end of the run when requested.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Rgb;

/// Which corrective action was applied to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionAction {
    ContrastFix,
    IconFlip,
    IconMove,
    IconPin,
    UniformShrink,
    IndividualShrink,
    RtlEnforced,
    TextReinjected,
}

/// One correction record, naming the affected shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub slide: usize,
    pub shape_id: u32,
    pub name: String,
    pub action: CorrectionAction,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Measured WCAG ratios, present for contrast fixes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_after: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_color: Option<Rgb>,
}

impl Correction {
    pub fn new(
        slide: usize,
        shape_id: u32,
        name: impl Into<String>,
        action: CorrectionAction,
    ) -> Self {
        Self {
            slide,
            shape_id,
            name: name.into(),
            action,
            note: String::new(),
            ratio_before: None,
            ratio_after: None,
            applied_color: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_ratios(mut self, before: f64, after: f64) -> Self {
        self.ratio_before = Some(before);
        self.ratio_after = Some(after);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.applied_color = Some(color);
        self
    }
}

/// Ordered list of applied corrections.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub corrections: Vec<Correction>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, correction: Correction) {
        self.corrections.push(correction);
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Write the log as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.corrections)
            .map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
