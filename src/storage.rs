//! Output file naming.
//!
//! Captures land in `<capture_dir>/captura_<YYYYMMDD_HHMMSS>.jpg`; annotated
//! captures in `<capture_dir>/analisis_<YYYYMMDD_HHMMSS>.jpg`; annotated copies
//! of a file given on the command line in `<analysis_dir>/<stem>_analisis.<ext>`.
//!
//! Timestamps have second resolution, so a second write within the same
//! second gets a `_1`, `_2`, ... suffix instead of overwriting the first.

use chrono::{DateTime, Local};
use image::ImageFormat;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPTURE_DIR: &str = "capturas";
pub const DEFAULT_ANALYSIS_DIR: &str = "analisis";
pub const CAPTURE_PREFIX: &str = "captura";
pub const ANALYSIS_PREFIX: &str = "analisis";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DEFAULT_EXTENSION: &str = "jpg";

/// A directory that receives timestamped image files.
#[derive(Clone, Debug)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if absent. Idempotent.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Next free `<prefix>_<timestamp>[_n].jpg` path for `now`.
    pub fn timestamped(&self, prefix: &str, now: DateTime<Local>) -> PathBuf {
        let stem = format!("{}_{}", prefix, now.format(TIMESTAMP_FORMAT));
        unique_path(&self.root, &stem, DEFAULT_EXTENSION)
    }

    /// Next free `<prefix>_<timestamp>[_n].jpg` path for the current time.
    pub fn timestamped_now(&self, prefix: &str) -> PathBuf {
        self.timestamped(prefix, Local::now())
    }
}

/// `<analysis_dir>/<stem>_analisis.<ext>` for a source image path.
///
/// The extension of the source is kept when this build can encode it;
/// anything else is written as JPEG.
pub fn analysis_path_for(source: &Path, analysis_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "imagen".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| {
            ImageFormat::from_extension(e)
                .map(|format| format.writing_enabled())
                .unwrap_or(false)
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    analysis_dir.join(format!("{}_{}.{}", stem, ANALYSIS_PREFIX, ext))
}

fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
