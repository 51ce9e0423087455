//! Name-pattern heuristics for icon classification.
//!
//! Designers name directional glyphs after what they depict ("Arrow 12",
//! "chevron-left"), so a case-insensitive substring match is enough to decide
//! which pictures get flipped for RTL. Logos, brand marks and QR codes must
//! never be flipped regardless of any other match.

/// Substrings that mark a shape as a directional icon.
const DIRECTIONAL: &[&str] = &[
    "arrow",
    "chevron",
    "caret",
    "triangle-right",
    "triangle-left",
    "play",
    "next",
    "prev",
    "bullet",
];

/// Substrings that mark a shape as a brand element (flip deny-list).
const LOGO_LIKE: &[&str] = &["logo", "brand", "qrcode"];

fn matches_any(name: &str, patterns: &[&str]) -> bool {
    let lower = name.to_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// Does the shape name indicate a directional icon (arrow, chevron, ...)?
pub fn is_directional(name: &str) -> bool {
    matches_any(name, DIRECTIONAL)
}

/// Does the shape name indicate a logo/brand element that must not be flipped?
pub fn is_logo_like(name: &str) -> bool {
    matches_any(name, LOGO_LIKE)
}
