//! Slide rasterization collaborator.
//!
//! Contrast correction and readability checks work on pixels, so they need
//! each slide rendered to a raster. Rendering is an external concern behind
//! the `SlideRenderer` trait; the provided implementation shells out to
//! LibreOffice and Poppler as blocking subprocesses with a fixed timeout.
//! Rendering failures degrade the optional stages that need pixels, they
//! never abort the geometry pipeline.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

/// Errors from the rendering collaborator
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render tool '{0}' not found on PATH")]
    ToolMissing(String),
    #[error("render subprocess I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("render subprocess exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
    #[error("converter produced no output for {0}")]
    NoOutput(PathBuf),
    #[error("failed to decode rendered page: {0}")]
    Decode(#[from] image::ImageError),
}

/// Renders every page of a deck file to an RGB raster at the given DPI.
///
/// One raster per slide, in slide order.
pub trait SlideRenderer {
    fn render(&self, deck: &Path, dpi: u32) -> Result<Vec<RgbImage>, RenderError>;
}

/// Renderer backed by `soffice --convert-to pdf` followed by `pdftoppm`.
#[derive(Debug, Clone)]
pub struct SofficeRenderer {
    pub soffice: PathBuf,
    pub pdftoppm: PathBuf,
    pub timeout: Duration,
}

impl Default for SofficeRenderer {
    fn default() -> Self {
        Self {
            soffice: PathBuf::from("soffice"),
            pdftoppm: PathBuf::from("pdftoppm"),
            timeout: Duration::from_secs(60),
        }
    }
}

impl SlideRenderer for SofficeRenderer {
    fn render(&self, deck: &Path, dpi: u32) -> Result<Vec<RgbImage>, RenderError> {
        let dir = tempfile::tempdir()?;
        debug!(deck = %deck.display(), dpi, "rendering deck via soffice/pdftoppm");

        let mut convert = Command::new(&self.soffice);
        convert
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(dir.path())
            .arg(deck);
        run_with_timeout(&mut convert, self.timeout)?;

        let stem = deck.file_stem().unwrap_or_default();
        let pdf = dir.path().join(stem).with_extension("pdf");
        if !pdf.exists() {
            return Err(RenderError::NoOutput(deck.to_path_buf()));
        }

        let prefix = dir.path().join("page");
        let mut rasterize = Command::new(&self.pdftoppm);
        rasterize
            .args(["-png", "-r", &dpi.to_string()])
            .arg(&pdf)
            .arg(&prefix);
        run_with_timeout(&mut rasterize, self.timeout)?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(dir.path())?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .collect();
        if pages.is_empty() {
            return Err(RenderError::NoOutput(pdf));
        }
        // pdftoppm zero-pads page numbers, so lexical order is page order
        pages.sort();

        let mut rasters = Vec::with_capacity(pages.len());
        for page in pages {
            rasters.push(image::open(&page)?.to_rgb8());
        }
        Ok(rasters)
    }
}

fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<(), RenderError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let start = Instant::now();
    let mut child = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                RenderError::ToolMissing(program)
            } else {
                RenderError::Io(e)
            }
        })?;
    loop {
        if let Some(status) = child.try_wait()? {
            return if status.success() {
                Ok(())
            } else {
                Err(RenderError::Failed(status))
            };
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RenderError::Timeout(timeout));
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported_by_name() {
        let renderer = SofficeRenderer {
            soffice: PathBuf::from("definitely-not-a-real-binary"),
            ..SofficeRenderer::default()
        };
        let err = renderer.render(Path::new("deck.pptx"), 150).unwrap_err();
        assert!(matches!(err, RenderError::ToolMissing(name) if name.contains("definitely")));
    }
}
