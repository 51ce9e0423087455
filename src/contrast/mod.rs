//! Pixel-sampled contrast correction.
//!
//! Declared run colors can be wrong or absent, so legibility is judged
//! against what the renderer actually produced: each text shape's EMU
//! bounding box is mapped into the rendered raster, the region is split
//! into foreground/background clusters with Otsu's method, and runs are
//! recolored only when the measured WCAG contrast is insufficient. The
//! decision is conservative: a shape keeps its colors unless every run in
//! it individually measures below the threshold, so intentional accent
//! runs survive.

pub mod otsu;

pub use otsu::{histogram, otsu_threshold};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, warn};

use crate::audit::{AuditLog, Correction, CorrectionAction};
use crate::model::{Document, Rgb, Shape, ShapeKind, EMU_PER_INCH};
use crate::palette::BrandPalette;

#[derive(Error, Debug)]
pub enum ContrastError {
    #[error("renderer produced {got} pages for {want} slides")]
    PageCount { got: usize, want: usize },
    #[error("rendered raster has zero size")]
    EmptyRaster,
}

/// Tunables for the contrast pass.
#[derive(Debug, Clone)]
pub struct ContrastConfig {
    /// Minimum acceptable WCAG contrast ratio
    pub min_ratio: f64,
    /// DPI the rasters were rendered at
    pub dpi: u32,
    /// Pixel padding around each mapped bounding box, catching anti-aliased
    /// glyph edges
    pub pad_px: i64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            min_ratio: 4.5,
            dpi: 300,
            pad_px: 6,
        }
    }
}

impl ContrastConfig {
    pub fn with_min_ratio(mut self, ratio: f64) -> Self {
        self.min_ratio = ratio;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_pad_px(mut self, pad: i64) -> Self {
        self.pad_px = pad;
        self
    }
}

/// WCAG relative luminance from linearized sRGB channels.
pub fn relative_luminance(c: Rgb) -> f64 {
    fn lin(v: u8) -> f64 {
        let c = v as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * lin(c.0) + 0.7152 * lin(c.1) + 0.0722 * lin(c.2)
}

/// WCAG contrast ratio, symmetric in its arguments, in `[1, 21]`.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (relative_luminance(a), relative_luminance(b));
    let (hi, lo) = if la >= lb { (la, lb) } else { (lb, la) };
    (hi + 0.05) / (lo + 0.05)
}

fn luma(c: &Rgb) -> u8 {
    (0.2126 * c.0 as f64 + 0.7152 * c.1 as f64 + 0.0722 * c.2 as f64).round() as u8
}

fn median_rgb(pixels: &[Rgb]) -> Rgb {
    let channel = |pick: fn(&Rgb) -> u8| -> u8 {
        let mut values: Vec<u8> = pixels.iter().map(pick).collect();
        values.sort_unstable();
        values[values.len() / 2]
    };
    Rgb(channel(|c| c.0), channel(|c| c.1), channel(|c| c.2))
}

/// Estimated foreground/background pair for a sampled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FgBg {
    /// Median of the darker cluster
    pub fg: Rgb,
    /// Median of the lighter cluster
    pub bg: Rgb,
}

/// Split a region into fg/bg clusters by Otsu on the luma channel.
///
/// When the split is degenerate (darker cluster under 2% or over 98% of
/// pixels the histogram was not actually bimodal), the darkest 10th
/// percentile is taken as foreground instead. A region with no separable
/// clusters at all yields black foreground over the region median.
pub fn estimate_fg_bg(pixels: &[Rgb]) -> Option<FgBg> {
    if pixels.is_empty() {
        return None;
    }
    let lumas: Vec<u8> = pixels.iter().map(luma).collect();
    let threshold = otsu_threshold(&histogram(&lumas));

    let (mut darker, mut lighter) = partition(pixels, &lumas, threshold);

    let frac = darker.len() as f64 / pixels.len() as f64;
    if !(0.02..=0.98).contains(&frac) {
        let mut sorted = lumas.clone();
        sorted.sort_unstable();
        let cut = sorted[(sorted.len() / 10).min(sorted.len() - 1)];
        (darker, lighter) = partition(pixels, &lumas, cut);
    }

    if darker.is_empty() || lighter.is_empty() {
        return Some(FgBg {
            fg: Rgb::BLACK,
            bg: median_rgb(pixels),
        });
    }
    Some(FgBg {
        fg: median_rgb(&darker),
        bg: median_rgb(&lighter),
    })
}

fn partition(pixels: &[Rgb], lumas: &[u8], cut: u8) -> (Vec<Rgb>, Vec<Rgb>) {
    let mut darker = Vec::new();
    let mut lighter = Vec::new();
    for (pixel, &l) in pixels.iter().zip(lumas) {
        if l <= cut {
            darker.push(*pixel);
        } else {
            lighter.push(*pixel);
        }
    }
    (darker, lighter)
}

/// Correct low-contrast text across a document, given one raster per slide.
///
/// Returns the number of shapes recolored.
pub fn correct_document(
    doc: &mut Document,
    rasters: &[RgbImage],
    palette: &BrandPalette,
    config: &ContrastConfig,
    audit: &mut AuditLog,
) -> Result<usize, ContrastError> {
    if rasters.len() != doc.slides.len() {
        return Err(ContrastError::PageCount {
            got: rasters.len(),
            want: doc.slides.len(),
        });
    }
    let expected_w = emu_to_inches(doc.slide_width) * config.dpi as f64;
    let expected_h = emu_to_inches(doc.slide_height) * config.dpi as f64;
    if expected_w <= 0.0 || expected_h <= 0.0 {
        return Err(ContrastError::EmptyRaster);
    }

    let mut fixed = 0;
    for (i, (slide, raster)) in doc.slides.iter_mut().zip(rasters).enumerate() {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(ContrastError::EmptyRaster);
        }
        // DPI rounding guard: renderers round page sizes to whole pixels,
        // so scale by the measured ratio instead of trusting the DPI alone
        let scale_x = raster.width() as f64 / expected_w;
        let scale_y = raster.height() as f64 / expected_h;
        for shape in &mut slide.shapes {
            fixed += correct_shape(
                shape,
                (0, 0),
                raster,
                (scale_x, scale_y),
                config,
                palette,
                i + 1,
                audit,
            );
        }
    }
    Ok(fixed)
}

fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

#[allow(clippy::too_many_arguments)]
fn correct_shape(
    shape: &mut Shape,
    offset: (i64, i64),
    raster: &RgbImage,
    scale: (f64, f64),
    config: &ContrastConfig,
    palette: &BrandPalette,
    slide_no: usize,
    audit: &mut AuditLog,
) -> usize {
    if let ShapeKind::Group(_) = shape.kind {
        let Some(frame) = shape.frame else { return 0 };
        let child_offset = (offset.0 + frame.left, offset.1 + frame.top);
        let ShapeKind::Group(children) = &mut shape.kind else {
            return 0;
        };
        return children
            .iter_mut()
            .map(|c| {
                correct_shape(c, child_offset, raster, scale, config, palette, slide_no, audit)
            })
            .sum();
    }

    if !shape.has_text() {
        return 0;
    }
    let Some(frame) = shape.frame else {
        warn!(slide_no, shape_id = shape.id, "text shape without geometry skipped by contrast pass");
        return 0;
    };

    let decision = {
        let Some(tf) = shape.text_frame() else { return 0 };
        let rect = px_rect(
            offset.0 + frame.left,
            offset.1 + frame.top,
            frame.width,
            frame.height,
            config,
            scale,
            raster.width(),
            raster.height(),
        );
        let Some((x0, y0, x1, y1)) = rect else {
            warn!(slide_no, shape_id = shape.id, "bounding box maps outside the raster; skipped");
            return 0;
        };
        let mut pixels = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
        for y in y0..y1 {
            for x in x0..x1 {
                let p = raster.get_pixel(x, y);
                pixels.push(Rgb(p[0], p[1], p[2]));
            }
        }
        let Some(est) = estimate_fg_bg(&pixels) else { return 0 };
        let bg = est.bg;

        let declared: Vec<Rgb> = tf.runs().filter_map(|r| r.color).collect();
        let before_fg = if declared.is_empty() {
            est.fg
        } else {
            median_rgb(&declared)
        };
        let ratio_before = contrast_ratio(before_fg, bg);

        // Only recolor when every run with content individually fails; a
        // single passing run means the colors are an intentional mix.
        let all_low = tf
            .runs()
            .filter(|r| !r.text.trim().is_empty())
            .all(|r| contrast_ratio(r.color.unwrap_or(est.fg), bg) < config.min_ratio);
        if !all_low {
            debug!(slide_no, shape_id = shape.id, ratio = ratio_before, "contrast acceptable");
            None
        } else {
            let dark_ratio = contrast_ratio(palette.dark, bg);
            let light_ratio = contrast_ratio(palette.light, bg);
            let (brand, brand_ratio) = if dark_ratio >= light_ratio {
                (palette.dark, dark_ratio)
            } else {
                (palette.light, light_ratio)
            };
            if brand_ratio >= config.min_ratio {
                Some((brand, ratio_before, brand_ratio, "brand color"))
            } else {
                // Black or white always clears the bar against any
                // background; flag the departure from the palette
                let black_ratio = contrast_ratio(Rgb::BLACK, bg);
                let white_ratio = contrast_ratio(Rgb::WHITE, bg);
                let (bw, bw_ratio) = if black_ratio >= white_ratio {
                    (Rgb::BLACK, black_ratio)
                } else {
                    (Rgb::WHITE, white_ratio)
                };
                Some((bw, ratio_before, bw_ratio, "fallback used"))
            }
        }
    };

    let Some((color, before, after, note)) = decision else {
        return 0;
    };
    if let Some(tf) = shape.text_frame_mut() {
        for run in tf.runs_mut() {
            run.color = Some(color);
        }
    }
    audit.push(
        Correction::new(slide_no, shape.id, &shape.name, CorrectionAction::ContrastFix)
            .with_ratios(before, after)
            .with_color(color)
            .with_note(note),
    );
    1
}

/// Map an absolute EMU box into raster pixel coordinates, padded and
/// clamped. `None` when the clamped box is empty.
#[allow(clippy::too_many_arguments)]
fn px_rect(
    left: i64,
    top: i64,
    width: i64,
    height: i64,
    config: &ContrastConfig,
    scale: (f64, f64),
    raster_w: u32,
    raster_h: u32,
) -> Option<(u32, u32, u32, u32)> {
    let to_px = |emu: i64, s: f64| -> i64 {
        (emu_to_inches(emu) * config.dpi as f64 * s).round() as i64
    };
    let x0 = (to_px(left, scale.0) - config.pad_px).clamp(0, raster_w as i64);
    let y0 = (to_px(top, scale.1) - config.pad_px).clamp(0, raster_h as i64);
    let x1 = (to_px(left + width, scale.0) + config.pad_px).clamp(0, raster_w as i64);
    let y1 = (to_px(top + height, scale.1) + config.pad_px).clamp(0, raster_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Frame, Run, ShapeKind, Slide, TextFrame};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_black_on_white_is_max_contrast() {
        let r = contrast_ratio(Rgb::BLACK, Rgb::WHITE);
        assert!((r - 21.0).abs() < 0.01, "got {r}");
        assert_eq!(contrast_ratio(Rgb::WHITE, Rgb::BLACK), r);
    }

    #[test]
    fn test_same_color_is_unit_contrast() {
        let c = Rgb(0x33, 0x66, 0x99);
        assert!((contrast_ratio(c, c) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_on_bimodal_region() {
        let mut pixels = vec![Rgb(20, 20, 20); 700];
        pixels.extend(vec![Rgb(230, 230, 230); 300]);
        let est = estimate_fg_bg(&pixels).unwrap();
        assert_eq!(est.fg, Rgb(20, 20, 20));
        assert_eq!(est.bg, Rgb(230, 230, 230));
    }

    #[test]
    fn test_estimate_on_uniform_region_degrades() {
        let pixels = vec![Rgb(30, 30, 60); 100];
        let est = estimate_fg_bg(&pixels).unwrap();
        assert_eq!(est.fg, Rgb::BLACK);
        assert_eq!(est.bg, Rgb(30, 30, 60));
    }

    #[test]
    fn test_estimate_on_empty_region() {
        assert!(estimate_fg_bg(&[]).is_none());
    }

    fn one_shape_doc(runs: Vec<Run>) -> Document {
        Document {
            slide_width: EMU_PER_INCH,
            slide_height: EMU_PER_INCH,
            slides: vec![Slide {
                shapes: vec![Shape {
                    id: 1,
                    name: "Title".into(),
                    kind: ShapeKind::TextBox(TextFrame {
                        paragraphs: vec![crate::model::Paragraph {
                            runs,
                            ..Default::default()
                        }],
                    }),
                    frame: Some(Frame::new(
                        EMU_PER_INCH / 4,
                        EMU_PER_INCH / 4,
                        EMU_PER_INCH / 2,
                        EMU_PER_INCH / 2,
                    )),
                    flip_h: false,
                }],
            }],
        }
    }

    fn run(text: &str, color: Option<Rgb>) -> Run {
        Run {
            text: text.into(),
            color,
            ..Run::default()
        }
    }

    fn dark_raster() -> RgbImage {
        RgbImage::from_pixel(96, 96, image::Rgb([30, 30, 60]))
    }

    #[test]
    fn test_low_contrast_text_is_recolored_upward() {
        let mut doc = one_shape_doc(vec![run("heading", Some(Rgb(40, 40, 40)))]);
        let config = ContrastConfig::default().with_dpi(96);
        let mut audit = AuditLog::new();
        let fixed = correct_document(
            &mut doc,
            &[dark_raster()],
            &BrandPalette::default(),
            &config,
            &mut audit,
        )
        .unwrap();

        assert_eq!(fixed, 1);
        // Dark gray on dark blue goes to the light brand color
        let shape = doc.shape(1, 1).unwrap();
        let colors: Vec<_> = shape.text_frame().unwrap().runs().map(|r| r.color).collect();
        assert_eq!(colors, vec![Some(Rgb::WHITE)]);

        let fix = &audit.corrections[0];
        assert_eq!(fix.action, CorrectionAction::ContrastFix);
        let (before, after) = (fix.ratio_before.unwrap(), fix.ratio_after.unwrap());
        assert!(after >= before, "recolor reduced contrast: {before} -> {after}");
        assert!(after >= 4.5);
    }

    #[test]
    fn test_one_passing_run_protects_the_shape() {
        let mut doc = one_shape_doc(vec![
            run("muted note ", Some(Rgb(40, 40, 40))),
            run("accent", Some(Rgb::WHITE)),
        ]);
        let config = ContrastConfig::default().with_dpi(96);
        let mut audit = AuditLog::new();
        let fixed = correct_document(
            &mut doc,
            &[dark_raster()],
            &BrandPalette::default(),
            &config,
            &mut audit,
        )
        .unwrap();

        assert_eq!(fixed, 0);
        assert!(audit.is_empty());
        // Original colors survive
        let shape = doc.shape(1, 1).unwrap();
        assert_eq!(shape.text_frame().unwrap().runs().next().unwrap().color, Some(Rgb(40, 40, 40)));
    }

    #[test]
    fn test_page_count_mismatch_is_an_error() {
        let mut doc = one_shape_doc(vec![run("x", None)]);
        let err = correct_document(
            &mut doc,
            &[],
            &BrandPalette::default(),
            &ContrastConfig::default(),
            &mut AuditLog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ContrastError::PageCount { got: 0, want: 1 }));
    }

    #[test]
    fn test_px_rect_clamps_to_raster() {
        let config = ContrastConfig::default().with_dpi(96).with_pad_px(6);
        let r = px_rect(0, 0, EMU_PER_INCH, EMU_PER_INCH, &config, (1.0, 1.0), 96, 96);
        assert_eq!(r, Some((0, 0, 96, 96)));

        // Box entirely off-raster
        let off = px_rect(
            EMU_PER_INCH * 4,
            0,
            EMU_PER_INCH,
            EMU_PER_INCH,
            &config,
            (1.0, 1.0),
            96,
            96,
        );
        assert_eq!(off, None);
    }
}
