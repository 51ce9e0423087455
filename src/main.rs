//! deckmirror CLI
//!
//! Works on the JSON rendition of a deck:
//!   deckmirror dump-map deck.json --out map.json
//!   deckmirror transform deck.json --out out.json --map map.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use image::RgbImage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use deckmirror::contrast::{correct_document, ContrastConfig};
use deckmirror::ocr::{readability_report, TesseractRecognizer};
use deckmirror::text::TextOptions;
use deckmirror::translate::dump_map;
use deckmirror::{
    load_document, save_document, BrandPalette, DeckError, OverlapConfig, Pipeline,
    PipelineConfig, RenderError, SlideRenderer, SofficeRenderer, TranslationMap,
};

#[derive(Parser)]
#[command(name = "deckmirror")]
#[command(about = "Geometry-preserving RTL localization for presentation decks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump every text shape and table cell to a translation map template
    DumpMap {
        /// Deck JSON file
        deck: PathBuf,

        /// Output path (stdout if not given)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply the full RTL transform
    Transform {
        /// Deck JSON file
        deck: PathBuf,

        /// Output deck JSON path
        #[arg(long)]
        out: PathBuf,

        /// Translation map JSON (key -> translated string)
        #[arg(long)]
        map: Option<PathBuf>,

        /// Skip geometry mirroring
        #[arg(long)]
        no_mirror: bool,

        /// Skip flipping directional icons
        #[arg(long)]
        no_flip_icons: bool,

        /// Skip reversing table columns
        #[arg(long)]
        no_reverse_tables: bool,

        /// Map ASCII digits to Arabic-Indic digits
        #[arg(long)]
        arabic_digits: bool,

        /// Font family forced onto runs containing Arabic letters
        #[arg(long)]
        arabic_font: Option<String>,

        /// Treat a shape-count mismatch as text loss on every mapped key
        #[arg(long)]
        strict_parity: bool,

        /// Alignment-group left-edge tolerance in EMU
        #[arg(long, default_value_t = 180_000)]
        alignment_tolerance: i64,

        /// Minimum cluster size treated as an intentional grid
        #[arg(long, default_value_t = 3)]
        min_group_size: usize,

        /// Directory for per-stage document snapshots
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Write the correction audit log here
        #[arg(long)]
        audit_out: Option<PathBuf>,

        /// Run pixel-based contrast correction
        #[arg(long)]
        contrast: bool,

        /// Renderable deck file (pptx/odp) for contrast sampling,
        /// rasterized via soffice + pdftoppm
        #[arg(long)]
        render: Option<PathBuf>,

        /// Directory of pre-rendered slide PNGs, one per slide in lexical
        /// order, as an alternative to --render
        #[arg(long)]
        rasters: Option<PathBuf>,

        /// Brand palette TOML (falls back to the embedded default)
        #[arg(long)]
        palette: Option<PathBuf>,

        /// Minimum acceptable WCAG contrast ratio
        #[arg(long, default_value_t = 4.5)]
        min_contrast: f64,

        /// Render/sampling DPI
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// Pixel padding around sampled bounding boxes
        #[arg(long, default_value_t = 6)]
        pad: i64,

        /// Write an OCR readability report here (needs rasters)
        #[arg(long)]
        ocr_report: Option<PathBuf>,

        /// Tesseract language code for the readability check
        #[arg(long, default_value = "ara")]
        ocr_lang: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DeckError> {
    match cli.command {
        Commands::DumpMap { deck, out } => {
            let doc = load_document(&deck)?;
            let map = dump_map(&doc);
            let json = serde_json::to_string_pretty(&map)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!(entries = map.len(), path = %path.display(), "translation map template written");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Commands::Transform {
            deck,
            out,
            map,
            no_mirror,
            no_flip_icons,
            no_reverse_tables,
            arabic_digits,
            arabic_font,
            strict_parity,
            alignment_tolerance,
            min_group_size,
            work_dir,
            audit_out,
            contrast,
            render,
            rasters,
            palette,
            min_contrast,
            dpi,
            pad,
            ocr_report,
            ocr_lang,
        } => {
            let doc = load_document(&deck)?;
            let translations = match map {
                Some(path) => TranslationMap::from_file(&path)?,
                None => TranslationMap::default(),
            };

            let mut config = PipelineConfig::default()
                .with_mirror(!no_mirror)
                .with_flip_icons(!no_flip_icons)
                .with_reverse_tables(!no_reverse_tables)
                .with_strict_parity(strict_parity)
                .with_text(TextOptions {
                    arabic_font,
                    arabic_digits,
                })
                .with_overlap(
                    OverlapConfig::default()
                        .with_alignment_tolerance(alignment_tolerance)
                        .with_min_group_size(min_group_size),
                );
            if let Some(dir) = work_dir {
                config = config.with_work_dir(dir);
            }

            let pipeline = Pipeline::new(translations, config);
            let mut outcome = pipeline.run(doc)?;
            for key in &outcome.unresolved {
                warn!(%key, "text could not be recovered; delivered without it");
            }

            // Optional pixel stages: failures here degrade, never abort
            let page_rasters = collect_rasters(render.as_deref(), rasters.as_deref(), dpi);
            if contrast {
                match &page_rasters {
                    Some(pages) => {
                        let brand = match palette {
                            Some(path) => BrandPalette::from_file(&path)?,
                            None => BrandPalette::default(),
                        };
                        let contrast_config = ContrastConfig::default()
                            .with_min_ratio(min_contrast)
                            .with_dpi(dpi)
                            .with_pad_px(pad);
                        match correct_document(
                            &mut outcome.doc,
                            pages,
                            &brand,
                            &contrast_config,
                            &mut outcome.audit,
                        ) {
                            Ok(fixed) => info!(fixed, "contrast correction complete"),
                            Err(e) => warn!("contrast correction skipped: {e}"),
                        }
                    }
                    None => warn!("contrast requested but no rasters available; skipped"),
                }
            }
            if let Some(report_path) = ocr_report {
                match &page_rasters {
                    Some(pages) => {
                        let recognizer = TesseractRecognizer::new(ocr_lang);
                        let report = readability_report(pages, &recognizer);
                        std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
                        info!(
                            all_readable = report.all_readable,
                            path = %report_path.display(),
                            "readability report written"
                        );
                    }
                    None => warn!("OCR report requested but no rasters available; skipped"),
                }
            }

            save_document(&outcome.doc, &out)?;
            if let Some(path) = audit_out {
                outcome.audit.write_json(&path)?;
                info!(corrections = outcome.audit.len(), path = %path.display(), "audit log written");
            }
            info!(
                recovery_attempts = outcome.recovery_attempts,
                alignment_groups = outcome.alignment_groups,
                out = %out.display(),
                "transform finished"
            );
            Ok(())
        }
    }
}

/// Rasters come either from rendering a deck file or from a directory of
/// pre-rendered PNGs. Failures log and return `None` so the pixel stages
/// degrade instead of aborting the run.
fn collect_rasters(
    render: Option<&Path>,
    rasters: Option<&Path>,
    dpi: u32,
) -> Option<Vec<RgbImage>> {
    if let Some(deck) = render {
        match SofficeRenderer::default().render(deck, dpi) {
            Ok(pages) => return Some(pages),
            Err(e) => {
                warn!("rendering failed: {e}");
                return None;
            }
        }
    }
    let dir = rasters?;
    match load_raster_dir(dir) {
        Ok(pages) if pages.is_empty() => {
            warn!(dir = %dir.display(), "no PNG files found");
            None
        }
        Ok(pages) => Some(pages),
        Err(e) => {
            warn!("loading rasters failed: {e}");
            None
        }
    }
}

fn load_raster_dir(dir: &Path) -> Result<Vec<RgbImage>, RenderError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
        .collect();
    paths.sort();
    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        pages.push(image::open(&path)?.to_rgb8());
    }
    Ok(pages)
}
