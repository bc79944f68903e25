//! Capture → detect → persist → display.
//!
//! `DetectOnCapture` is the hook the capture loop runs after each capture in
//! the detecting variant; `analyze_file` is the direct entry point for an
//! image that already exists on disk.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

use crate::capture::CaptureHook;
use crate::detect::{DetectionClient, DetectionResult, VisionService};
use crate::preview::{Preview, RESULT_TITLE};
use crate::storage::{analysis_path_for, OutputDir, ANALYSIS_PREFIX};
use crate::ui::Ui;

/// Outcome of analysing and persisting one image.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub source: PathBuf,
    pub person_detected: bool,
    pub person_count: usize,
    /// Where the annotated copy was written. `None` when the source could
    /// not be loaded.
    pub output: Option<PathBuf>,
}

/// Runs detection on every capture and saves `analisis_<timestamp>.jpg`
/// next to it.
pub struct DetectOnCapture<'a, V: VisionService> {
    client: &'a DetectionClient<V>,
    output: OutputDir,
    ui: Ui,
    reports: Vec<AnalysisReport>,
}

impl<'a, V: VisionService> DetectOnCapture<'a, V> {
    pub fn new(client: &'a DetectionClient<V>, output_dir: impl Into<PathBuf>, ui: Ui) -> Self {
        Self {
            client,
            output: OutputDir::new(output_dir),
            ui,
            reports: Vec::new(),
        }
    }

    pub fn reports(&self) -> &[AnalysisReport] {
        &self.reports
    }
}

impl<V: VisionService> CaptureHook for DetectOnCapture<'_, V> {
    fn on_capture(&mut self, capture: &Path, preview: &mut dyn Preview) -> Result<()> {
        let result = run_detection(self.client, capture, &self.ui);
        let output = match &result.annotated {
            Some(annotated) => {
                self.output
                    .ensure()
                    .with_context(|| format!("create {}", self.output.root().display()))?;
                let path = self.output.timestamped_now(ANALYSIS_PREFIX);
                save_annotated(annotated, &path)?;
                preview.show(RESULT_TITLE, annotated)?;
                Some(path)
            }
            None => None,
        };
        self.reports.push(report(capture, &result, output));
        Ok(())
    }
}

/// Analyse an existing image, write `<analysis_dir>/<stem>_analisis.<ext>`.
///
/// When a preview is given the result is shown and this blocks until a key
/// is pressed.
pub fn analyze_file<V: VisionService>(
    client: &DetectionClient<V>,
    path: &Path,
    analysis_dir: &Path,
    ui: &Ui,
    preview: Option<&mut dyn Preview>,
) -> Result<AnalysisReport> {
    let result = run_detection(client, path, ui);
    let Some(annotated) = &result.annotated else {
        return Ok(report(path, &result, None));
    };

    std::fs::create_dir_all(analysis_dir)
        .with_context(|| format!("create {}", analysis_dir.display()))?;
    let output = analysis_path_for(path, analysis_dir);
    save_annotated(annotated, &output)?;

    if let Some(preview) = preview {
        preview.show(RESULT_TITLE, annotated)?;
        log::info!("press any key to close");
        preview.wait_key()?;
        preview.close();
    }
    Ok(report(path, &result, Some(output)))
}

fn run_detection<V: VisionService>(
    client: &DetectionClient<V>,
    path: &Path,
    ui: &Ui,
) -> DetectionResult {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut stage = ui.stage(&format!("analyzing {}", name));
    let result = client.detect(path);
    stage.set_outcome(if result.person_detected {
        format!("{} person(s)", result.person_count)
    } else {
        "no persons".to_string()
    });
    result
}

fn save_annotated(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("write annotated image {}", path.display()))?;
    log::info!("annotated image saved as {}", path.display());
    Ok(())
}

fn report(source: &Path, result: &DetectionResult, output: Option<PathBuf>) -> AnalysisReport {
    AnalysisReport {
        source: source.to_path_buf(),
        person_detected: result.person_detected,
        person_count: result.person_count,
        output,
    }
}
