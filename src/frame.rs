//! Decoded camera frames.
//!
//! - `Frame`: one RGB24 bitmap produced by a `FrameSource`. Owned by the loop
//!   iteration that read it and dropped (or overwritten) on the next cycle.
//!
//! Frames are never shared across threads and never cached.

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbImage};
use std::path::Path;
use std::time::Instant;

// ----------------------------------------------------------------------------
// Frame: one decoded RGB bitmap
// ----------------------------------------------------------------------------

/// One decoded RGB frame (`width * height * 3` bytes).
pub struct Frame {
    image: RgbImage,

    /// Sequence number assigned by the source (1-based).
    pub index: u64,

    /// Monotonic capture instant.
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("invalid frame dimensions {}x{}", width, height))?;
        Ok(Self::from_image(image, index))
    }

    pub fn from_image(image: RgbImage, index: u64) -> Self {
        Self {
            image,
            index,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Milliseconds since the source produced this frame.
    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }

    /// Persist the frame as JPEG. The parent directory must exist.
    pub fn save_jpeg(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Jpeg)
            .with_context(|| format!("encode jpeg {}", path.display()))
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_rejects_short_buffers() {
        let err = Frame::from_rgb(vec![0u8; 10], 2, 2, 1);
        assert!(err.is_err());
    }

    #[test]
    fn from_rgb_keeps_dimensions() -> Result<()> {
        let frame = Frame::from_rgb(vec![7u8; 4 * 3 * 3], 4, 3, 9)?;
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.index, 9);
        assert_eq!(frame.image().get_pixel(3, 2).0, [7, 7, 7]);
        Ok(())
    }

    #[test]
    fn saved_jpeg_decodes_with_same_dimensions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.jpg");
        let frame = Frame::from_rgb(vec![128u8; 32 * 24 * 3], 32, 24, 1)?;
        frame.save_jpeg(&path)?;

        let decoded = image::open(&path)?;
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
        Ok(())
    }
}
