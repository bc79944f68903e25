//! Integration tests for the capture loop.
//!
//! These tests verify that:
//! 1. Each capture key press writes exactly one decodable image
//! 2. The camera and preview are released exactly once on every exit path
//! 3. An unavailable camera or a failed read ends the session with an error
//! 4. The post-capture hook runs synchronously once per capture

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use captura::{
    CameraConfig, CameraSource, CaptureError, CaptureLoop, CaptureSettings, Frame, FrameSource,
    Preview,
};

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;

struct MockCamera {
    open_fails: bool,
    fail_after: Option<u64>,
    frames: u64,
    opens: u32,
    releases: u32,
}

impl MockCamera {
    fn new() -> Self {
        Self {
            open_fails: false,
            fail_after: None,
            frames: 0,
            opens: 0,
            releases: 0,
        }
    }
}

impl FrameSource for MockCamera {
    fn device(&self) -> &str {
        "mock://camera"
    }

    fn open(&mut self) -> Result<()> {
        self.opens += 1;
        if self.open_fails {
            return Err(anyhow!("no such device"));
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if let Some(limit) = self.fail_after {
            if self.frames >= limit {
                return Err(anyhow!("device unplugged"));
            }
        }
        self.frames += 1;
        let shade = (self.frames * 10 % 256) as u8;
        Ok(Frame::from_image(
            RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([shade, 64, 200])),
            self.frames,
        ))
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

/// Returns one scripted key per poll, then quits.
struct ScriptedPreview {
    keys: VecDeque<Option<char>>,
    shown: Vec<String>,
    closes: u32,
}

impl ScriptedPreview {
    fn new(keys: &[Option<char>]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            shown: Vec::new(),
            closes: 0,
        }
    }
}

impl Preview for ScriptedPreview {
    fn show(&mut self, title: &str, _image: &RgbImage) -> Result<()> {
        self.shown.push(title.to_string());
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        Ok(self.keys.pop_front().unwrap_or(Some('q')))
    }

    fn wait_key(&mut self) -> Result<Option<char>> {
        self.poll_key()
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

fn capture_loop(dir: &Path) -> CaptureLoop {
    CaptureLoop::new(CaptureSettings::new(dir.join("capturas")))
}

#[test]
fn quit_without_capture_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    let mut preview = ScriptedPreview::new(&[None, Some('x'), Some('q')]);

    let summary = capture_loop(dir.path())
        .run(&mut camera, &mut preview, None)
        .expect("capture session");

    assert!(!summary.captured());
    assert!(summary.last_capture().is_none());
    assert_eq!(summary.frames_read, 3);
    assert_eq!(camera.opens, 1);
    assert_eq!(camera.releases, 1);
    assert_eq!(preview.closes, 1);
    assert!(!dir.path().join("capturas").exists());
}

#[test]
fn each_capture_key_writes_one_image() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    let mut preview =
        ScriptedPreview::new(&[None, Some(' '), None, Some(' '), Some(' '), Some('q')]);

    let summary = capture_loop(dir.path())
        .run(&mut camera, &mut preview, None)
        .expect("capture session");

    assert_eq!(summary.captures.len(), 3);
    assert_eq!(summary.last_capture(), summary.captures.get(2).map(PathBuf::as_path));
    assert_eq!(camera.releases, 1);
    assert_eq!(preview.closes, 1);

    let mut unique: Vec<&PathBuf> = summary.captures.iter().collect();
    unique.dedup();
    assert_eq!(unique.len(), 3, "captures must not overwrite each other");

    let on_disk = std::fs::read_dir(dir.path().join("capturas"))
        .unwrap()
        .count();
    assert_eq!(on_disk, 3);

    for path in &summary.captures {
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("captura_"), "unexpected name {}", name);
        assert!(name.ends_with(".jpg"));
        let decoded = image::open(path).expect("decode capture");
        assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
    }
}

#[test]
fn frame_read_failure_is_fatal_and_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    camera.fail_after = Some(2);
    let mut preview = ScriptedPreview::new(&[Some(' '), None, None, None]);

    let err = capture_loop(dir.path())
        .run(&mut camera, &mut preview, None)
        .unwrap_err();

    match err {
        CaptureError::FrameRead { frame, .. } => assert_eq!(frame, 3),
        other => panic!("expected FrameRead, got {:?}", other),
    }
    assert_eq!(camera.releases, 1);
    assert_eq!(preview.closes, 1);
    assert_eq!(
        std::fs::read_dir(dir.path().join("capturas")).unwrap().count(),
        1
    );
}

#[test]
fn unavailable_camera_fails_without_reading() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    camera.open_fails = true;
    let mut preview = ScriptedPreview::new(&[]);

    let err = capture_loop(dir.path())
        .run(&mut camera, &mut preview, None)
        .unwrap_err();

    assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
    assert_eq!(camera.opens, 1);
    assert_eq!(camera.frames, 0);
    assert!(preview.shown.is_empty());
}

#[test]
fn hook_runs_once_per_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    let mut preview = ScriptedPreview::new(&[Some(' '), None, Some(' '), Some('Q')]);

    let mut seen: Vec<PathBuf> = Vec::new();
    let mut hook = |path: &Path, preview: &mut dyn Preview| -> Result<()> {
        assert!(path.exists(), "capture must be on disk before the hook");
        preview.show("hook", &RgbImage::new(1, 1))?;
        seen.push(path.to_path_buf());
        Ok(())
    };

    let summary = capture_loop(dir.path())
        .run(&mut camera, &mut preview, Some(&mut hook))
        .expect("capture session");

    assert_eq!(seen, summary.captures);
    assert_eq!(preview.shown.iter().filter(|t| *t == "hook").count(), 2);
    assert_eq!(preview.closes, 1);
}

#[test]
fn failing_hook_does_not_end_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = MockCamera::new();
    let mut preview = ScriptedPreview::new(&[Some(' '), Some(' '), Some('q')]);

    let mut calls = 0;
    let mut hook = |_: &Path, _: &mut dyn Preview| -> Result<()> {
        calls += 1;
        Err(anyhow!("remote down"))
    };

    let summary = capture_loop(dir.path())
        .run(&mut camera, &mut preview, Some(&mut hook))
        .expect("capture session");

    assert_eq!(calls, 2);
    assert_eq!(summary.captures.len(), 2);
    assert_eq!(camera.releases, 1);
}

#[test]
fn stop_flag_ends_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let mut camera = MockCamera::new();
    let mut preview = ScriptedPreview::new(&[None; 16]);

    let flag = stop.clone();
    let mut hook = move |_: &Path, _: &mut dyn Preview| -> Result<()> {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    };
    preview.keys.push_front(Some(' '));

    let summary = capture_loop(dir.path())
        .with_stop_flag(stop)
        .run(&mut camera, &mut preview, Some(&mut hook))
        .expect("capture session");

    assert_eq!(summary.frames_read, 1);
    assert_eq!(summary.captures.len(), 1);
    assert_eq!(camera.releases, 1);
}

#[test]
fn synthetic_camera_disconnect_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = CameraSource::new(CameraConfig {
        device: "stub://bench?frames=4".to_string(),
        target_fps: 0,
        width: 64,
        height: 48,
    })
    .unwrap();
    let mut preview = ScriptedPreview::new(&[None, Some(' '), None, None, None]);

    let err = capture_loop(dir.path())
        .run(&mut camera, &mut preview, None)
        .unwrap_err();

    assert!(matches!(err, CaptureError::FrameRead { .. }));
    assert_eq!(camera.stats().frames_captured, 4);
    assert_eq!(preview.closes, 1);
}
