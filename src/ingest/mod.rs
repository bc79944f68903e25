//! Frame sources.
//!
//! - `stub://` synthetic camera (tests, demos)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! Every source produces RGB24 `Frame`s. A source is opened once, read in a
//! loop, and released once by the capture session that owns it.

pub mod camera;
#[cfg(any(test, feature = "ingest-v4l2"))]
mod normalize;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

pub use camera::{CameraConfig, CameraSource, CameraStats};

use anyhow::Result;

use crate::frame::Frame;

/// A device that yields frames.
pub trait FrameSource {
    /// Human-readable device identifier for logs and errors.
    fn device(&self) -> &str;

    /// Acquire the device. Called once before the first read.
    fn open(&mut self) -> Result<()>;

    /// Read the next frame, blocking until one is available.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Release the device. Called exactly once by the session guard.
    fn release(&mut self);
}
