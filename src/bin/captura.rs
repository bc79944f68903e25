//! captura - camera capture with remote person detection
//!
//! Without arguments this:
//! 1. Opens the configured camera and shows a live preview
//! 2. Saves the current frame to `capturas/` on the capture key
//! 3. Sends each capture to the vision service and saves/shows the annotated
//!    result (skipped with --no-detect)
//! 4. Exits on the quit key, Ctrl-C, or a camera failure
//!
//! With an image path it analyses that file, writes the annotated copy to
//! `analisis/`, shows it and waits for a key.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use captura::config::SETUP_INSTRUCTIONS;
use captura::{
    analyze_file, open_preview, CameraSource, CapturaConfig, CaptureLoop, CaptureSettings,
    DetectOnCapture, DetectionClient, PreviewKind, Ui,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture stills from a camera and count the persons in them"
)]
struct Args {
    /// Analyse this image instead of opening the camera.
    image: Option<PathBuf>,

    /// Only save captures; do not call the vision service.
    #[arg(long)]
    no_detect: bool,

    /// Camera device node, or stub://<name> for a synthetic camera.
    #[arg(long)]
    device: Option<String>,

    /// Target frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Preferred frame width.
    #[arg(long)]
    width: Option<u32>,

    /// Preferred frame height.
    #[arg(long)]
    height: Option<u32>,

    /// Directory for captures and their annotated copies.
    #[arg(long)]
    capture_dir: Option<PathBuf>,

    /// Directory for annotated copies of files given on the command line.
    #[arg(long)]
    analysis_dir: Option<PathBuf>,

    /// Preview backend: auto, terminal or highgui.
    #[arg(long, default_value = "auto")]
    preview: String,

    /// Progress output: auto, plain or pretty.
    #[arg(long)]
    ui: Option<String>,
}

impl Args {
    fn apply(&self, cfg: &mut CapturaConfig) {
        if let Some(device) = &self.device {
            cfg.camera.device = device.clone();
        }
        if let Some(fps) = self.fps {
            cfg.camera.target_fps = fps;
        }
        if let Some(width) = self.width {
            cfg.camera.width = width;
        }
        if let Some(height) = self.height {
            cfg.camera.height = height;
        }
        if let Some(dir) = &self.capture_dir {
            cfg.output.capture_dir = dir.clone();
        }
        if let Some(dir) = &self.analysis_dir {
            cfg.output.analysis_dir = dir.clone();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = CapturaConfig::load()?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let detecting = args.image.is_some() || !args.no_detect;
    if detecting && !cfg.vision.is_configured() {
        for line in SETUP_INSTRUCTIONS.lines() {
            log::warn!("{}", line);
        }
    }

    let ui = Ui::from_args(args.ui.as_deref());
    let mut preview = open_preview(PreviewKind::parse(&args.preview)?, cfg.keys)?;
    let client = DetectionClient::new(&cfg.vision);

    if let Some(image) = &args.image {
        let report = analyze_file(
            &client,
            image,
            &cfg.output.analysis_dir,
            &ui,
            Some(preview.as_mut()),
        )?;
        match &report.output {
            Some(output) => log::info!(
                "{}: {} person(s), annotated copy at {}",
                report.source.display(),
                report.person_count,
                output.display()
            ),
            None => log::warn!("{}: image could not be analysed", report.source.display()),
        }
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("install ctrl-c handler")?;
    }

    let mut settings = CaptureSettings::new(&cfg.output.capture_dir);
    settings.keys = cfg.keys;
    let capture_loop = CaptureLoop::new(settings).with_stop_flag(stop);
    let mut source = CameraSource::new(cfg.camera.clone())?;

    let summary = if args.no_detect {
        capture_loop.run(&mut source, &mut preview, None)?
    } else {
        let mut hook = DetectOnCapture::new(&client, &cfg.output.capture_dir, ui.clone());
        let summary = capture_loop.run(&mut source, &mut preview, Some(&mut hook))?;
        let persons: usize = hook.reports().iter().map(|r| r.person_count).sum();
        log::info!(
            "{} analyses, {} person(s) in total",
            hook.reports().len(),
            persons
        );
        summary
    };

    let stats = source.stats();
    log::info!(
        "{} frames from {}, {} image(s) saved",
        stats.frames_captured,
        stats.device,
        summary.captures.len()
    );
    match summary.last_capture() {
        Some(last) => log::info!("last capture: {}", last.display()),
        None => log::info!("no image was captured"),
    }
    Ok(())
}
