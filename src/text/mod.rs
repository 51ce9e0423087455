//! RTL text enforcement: paragraph direction, alignment, digits, fonts.
//!
//! True RTL needs the paragraph-level direction flag set, not just right
//! alignment; both are applied together and the whole operation is
//! idempotent, so re-running it after recovery is safe.

use crate::model::{Alignment, Run, Table, TextFrame};

/// Options that shape how text is rewritten during the transform.
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    /// Font family forced onto runs containing Arabic letters
    pub arabic_font: Option<String>,
    /// Map ASCII digits to Arabic-Indic digits
    pub arabic_digits: bool,
}

/// Map `0-9` to Arabic-Indic `٠-٩`; all other characters pass through.
pub fn to_arabic_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '0'..='9' => {
                // U+0660 is ARABIC-INDIC DIGIT ZERO
                char::from_u32(0x0660 + (c as u32 - '0' as u32)).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Does the string contain any character from the Arabic block?
pub fn contains_arabic(s: &str) -> bool {
    s.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

fn normalize_run(run: &mut Run, opts: &TextOptions) {
    if opts.arabic_digits {
        run.text = to_arabic_digits(&run.text);
    }
    if let Some(font) = &opts.arabic_font {
        if contains_arabic(&run.text) {
            run.font = Some(font.clone());
        }
    }
}

/// Set the RTL flag and right alignment on every paragraph, then normalize
/// runs (digits, font). Applying this twice yields the same frame as once.
pub fn enforce_frame_rtl(frame: &mut TextFrame, opts: &TextOptions) {
    for paragraph in &mut frame.paragraphs {
        paragraph.rtl = true;
        paragraph.align = Alignment::Right;
        for run in &mut paragraph.runs {
            normalize_run(run, opts);
        }
    }
}

/// Replace a frame's content with a single paragraph/run carrying `text`,
/// preserving the first original run's color, font and size, then enforce
/// RTL on the result.
///
/// Empty replacement text is ignored: content is never erased through an
/// empty translation.
pub fn set_frame_text(frame: &mut TextFrame, text: &str, opts: &TextOptions) {
    if text.is_empty() {
        return;
    }
    let template = frame.runs().next().cloned();
    let mut run = Run {
        text: text.to_string(),
        ..Run::default()
    };
    if let Some(orig) = template {
        run.color = orig.color;
        run.font = orig.font;
        run.size_pt = orig.size_pt;
    }
    *frame = TextFrame {
        paragraphs: vec![crate::model::Paragraph {
            runs: vec![run],
            rtl: false,
            align: Alignment::Left,
        }],
    };
    enforce_frame_rtl(frame, opts);
}

/// Reverse the column order of every row's cell contents. Structure (row and
/// column counts) is unchanged; only the text frames swap places.
pub fn reverse_table_columns(table: &mut Table) {
    for row in 0..table.rows {
        let start = row * table.cols;
        table.cells[start..start + table.cols].reverse();
    }
}

/// RTL-enforce every cell of a table.
pub fn enforce_table_rtl(table: &mut Table, opts: &TextOptions) {
    for cell in &mut table.cells {
        enforce_frame_rtl(cell, opts);
    }
}
