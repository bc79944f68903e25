//! Camera frame source.
//!
//! `CameraSource` picks a backend from the device string:
//! - `stub://<name>[?frames=N]` produces deterministic synthetic frames and,
//!   with `frames=N`, fails the read after N frames (a simulated unplug);
//! - anything else is a V4L2 device node such as `/dev/video0` and requires
//!   the `ingest-v4l2` feature.

use anyhow::{anyhow, Context, Result};
use std::time::{Duration, Instant};
use url::Url;

#[cfg(feature = "ingest-v4l2")]
use super::v4l2::DeviceSource;
use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://` URL.
    pub device: String,
    /// Target frame rate. Zero disables pacing for synthetic sources.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticSource::new(config)?),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(DeviceSource::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera device {} requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

impl FrameSource for CameraSource {
    fn device(&self) -> &str {
        match &self.backend {
            CameraBackend::Synthetic(source) => &source.config.device,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.device(),
        }
    }

    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.open(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.open(),
        }
    }

    fn read_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.read_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.read_frame(),
        }
    }

    fn release(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.release(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.release(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticSource {
    config: CameraConfig,
    frame_limit: Option<u64>,
    frame_count: u64,
    opened: bool,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let url = Url::parse(&config.device)
            .with_context(|| format!("parse synthetic camera url {}", config.device))?;
        let mut frame_limit = None;
        for (key, value) in url.query_pairs() {
            if key == "frames" {
                let limit: u64 = value
                    .parse()
                    .map_err(|_| anyhow!("stub camera frames must be an integer"))?;
                frame_limit = Some(limit);
            }
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("stub camera dimensions must be non-zero"));
        }
        Ok(Self {
            config,
            frame_limit,
            frame_count: 0,
            opened: false,
            last_frame_at: None,
        })
    }

    fn open(&mut self) -> Result<()> {
        self.opened = true;
        log::info!(
            "CameraSource: connected to {} (synthetic {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(anyhow!("synthetic camera not opened"));
        }
        if let Some(limit) = self.frame_limit {
            if self.frame_count >= limit {
                return Err(anyhow!(
                    "synthetic camera {} disconnected after {} frames",
                    self.config.device,
                    limit
                ));
            }
        }
        self.pace();

        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::from_rgb(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
    }

    fn release(&mut self) {
        if self.opened {
            log::info!(
                "CameraSource: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
        self.opened = false;
    }

    /// Sleep off whatever is left of the frame interval.
    fn pace(&mut self) {
        let interval = frame_interval(self.config.target_fps);
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }

    /// Diagonal gradient that drifts one step per frame.
    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.config.width as u64;
        let height = self.config.height as u64;
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let base = x + y + self.frame_count;
                pixels.push((base % 256) as u8);
                pixels.push(((base / 2) % 256) as u8);
                pixels.push(((x * 255) / width.max(1)) as u8);
            }
        }
        pixels
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

pub(crate) fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            target_fps: 0,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn stub_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        source.open()?;

        let frame = source.read_frame()?;
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.index, 1);
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn stub_source_requires_open() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        assert!(source.read_frame().is_err());
        Ok(())
    }

    #[test]
    fn stub_source_disconnects_after_frame_limit() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test?frames=2"))?;
        source.open()?;

        source.read_frame()?;
        source.read_frame()?;
        assert!(source.read_frame().is_err());
        Ok(())
    }

    #[test]
    fn stub_frames_change_over_time() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        source.open()?;

        let first = source.read_frame()?;
        let second = source.read_frame()?;
        assert_ne!(first.image().as_raw(), second.image().as_raw());
        Ok(())
    }

    #[test]
    fn rejects_bad_frame_limit() {
        assert!(CameraSource::new(stub_config("stub://test?frames=many")).is_err());
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn device_paths_require_feature() {
        assert!(CameraSource::new(stub_config("/dev/video0")).is_err());
    }

    #[test]
    fn frame_interval_handles_zero_fps() {
        assert_eq!(frame_interval(0), Duration::from_millis(0));
        assert_eq!(frame_interval(10), Duration::from_millis(100));
    }
}
