//! The interactive capture loop.
//!
//! Each iteration reads one frame, shows it, and polls one key. The capture
//! key writes the frame to a fresh timestamped file and runs the optional
//! hook before the loop continues; the quit key (or the stop flag) ends the
//! loop. A frame read failure ends it with an error.
//!
//! The camera and preview are released by a guard on every exit path, once.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::CaptureError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::preview::{Key, KeyBindings, Preview, CAPTURE_TITLE};
use crate::storage::{OutputDir, CAPTURE_PREFIX};

/// Work run synchronously after every capture, before the next frame.
pub trait CaptureHook {
    fn on_capture(&mut self, capture: &Path, preview: &mut dyn Preview) -> Result<()>;
}

impl<F> CaptureHook for F
where
    F: FnMut(&Path, &mut dyn Preview) -> Result<()>,
{
    fn on_capture(&mut self, capture: &Path, preview: &mut dyn Preview) -> Result<()> {
        self(capture, preview)
    }
}

#[derive(Clone, Debug)]
pub struct CaptureSettings {
    pub capture_dir: PathBuf,
    pub keys: KeyBindings,
    pub window_title: String,
}

impl CaptureSettings {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            capture_dir: capture_dir.into(),
            keys: KeyBindings::default(),
            window_title: CAPTURE_TITLE.to_string(),
        }
    }
}

/// What happened during one capture session.
#[derive(Clone, Debug, Default)]
pub struct CaptureSummary {
    /// Written capture files, in order.
    pub captures: Vec<PathBuf>,
    pub frames_read: u64,
}

impl CaptureSummary {
    /// At least one image was saved.
    pub fn captured(&self) -> bool {
        !self.captures.is_empty()
    }

    pub fn last_capture(&self) -> Option<&Path> {
        self.captures.last().map(PathBuf::as_path)
    }
}

pub struct CaptureLoop {
    settings: CaptureSettings,
    output: OutputDir,
    stop: Option<Arc<AtomicBool>>,
}

impl CaptureLoop {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            output: OutputDir::new(settings.capture_dir.clone()),
            settings,
            stop: None,
        }
    }

    /// End the loop as if the quit key was pressed once `stop` becomes true.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Run until quit, stop flag, or a fatal device error.
    pub fn run<S, P>(
        &self,
        source: &mut S,
        preview: &mut P,
        mut hook: Option<&mut dyn CaptureHook>,
    ) -> Result<CaptureSummary, CaptureError>
    where
        S: FrameSource + ?Sized,
        P: Preview + ?Sized,
    {
        let device = source.device().to_string();
        source
            .open()
            .map_err(|err| CaptureError::DeviceUnavailable {
                device: device.clone(),
                source: err.into(),
            })?;
        log::info!(
            "camera {} ready; press {:?} to capture, {:?} to quit",
            device,
            self.settings.keys.capture,
            self.settings.keys.quit
        );

        let mut session = Session { source, preview };
        let mut summary = CaptureSummary::default();

        loop {
            if self.stop_requested() {
                log::info!("stop requested, leaving capture loop");
                break;
            }

            let frame = session
                .source
                .read_frame()
                .map_err(|err| CaptureError::FrameRead {
                    device: device.clone(),
                    frame: summary.frames_read + 1,
                    source: err.into(),
                })?;
            summary.frames_read += 1;

            session
                .preview
                .show(&self.settings.window_title, frame.image())
                .map_err(|err| CaptureError::Preview(err.into()))?;

            let key = session
                .preview
                .poll_key()
                .map_err(|err| CaptureError::Preview(err.into()))?;
            match key.map(|k| self.settings.keys.classify(k)) {
                Some(Key::Quit) => {
                    log::info!("quit key pressed");
                    break;
                }
                Some(Key::Capture) => {
                    let path = self.save(&frame)?;
                    log::info!("image saved as {}", path.display());
                    log::debug!("frame {} written {}ms after read", frame.index, frame.age_ms());
                    summary.captures.push(path.clone());
                    drop(frame);

                    if let Some(hook) = hook.as_deref_mut() {
                        let preview: &mut dyn Preview = &mut PreviewRef(&mut *session.preview);
                        if let Err(err) = hook.on_capture(&path, preview) {
                            log::error!("post-capture step failed for {}: {:#}", path.display(), err);
                        }
                    }
                }
                Some(Key::Other) | None => {}
            }
        }

        log::info!(
            "capture session ended: {} frames, {} captures",
            summary.frames_read,
            summary.captures.len()
        );
        Ok(summary)
    }

    fn save(&self, frame: &Frame) -> Result<PathBuf, CaptureError> {
        let write_error = |path: PathBuf, source: anyhow::Error| CaptureError::Write {
            path,
            source: source.into(),
        };
        self.output
            .ensure()
            .map_err(|err| write_error(self.output.root().to_path_buf(), err.into()))?;
        let path = self.output.timestamped_now(CAPTURE_PREFIX);
        frame
            .save_jpeg(&path)
            .map_err(|err| write_error(path.clone(), err))?;
        Ok(path)
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .map(|stop| stop.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

/// Owns the borrowed device and preview for the session. Dropping it is the
/// only place either is released.
struct Session<'a, S: FrameSource + ?Sized, P: Preview + ?Sized> {
    source: &'a mut S,
    preview: &'a mut P,
}

impl<S: FrameSource + ?Sized, P: Preview + ?Sized> Drop for Session<'_, S, P> {
    fn drop(&mut self) {
        self.source.release();
        self.preview.close();
    }
}

/// Lends a possibly unsized preview to a hook as `&mut dyn Preview`.
/// `close` is swallowed: the session guard owns that call.
struct PreviewRef<'a, P: Preview + ?Sized>(&'a mut P);

impl<P: Preview + ?Sized> Preview for PreviewRef<'_, P> {
    fn show(&mut self, title: &str, image: &image::RgbImage) -> Result<()> {
        self.0.show(title, image)
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        self.0.poll_key()
    }

    fn wait_key(&mut self) -> Result<Option<char>> {
        self.0.wait_key()
    }

    fn close(&mut self) {}
}
