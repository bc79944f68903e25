use anyhow::{Context, Result};
use image::RgbImage;
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
};
use std::collections::HashSet;

use super::Preview;

/// Native OpenCV windows, one per title.
pub struct HighguiPreview {
    windows: HashSet<String>,
}

impl HighguiPreview {
    pub fn new() -> Self {
        Self {
            windows: HashSet::new(),
        }
    }
}

impl Default for HighguiPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl Preview for HighguiPreview {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        if self.windows.insert(title.to_string()) {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("open window {}", title))?;
        }

        // OpenCV wants BGR rows.
        let mut rgb = Mat::new_rows_cols_with_default(
            image.height() as i32,
            image.width() as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )
        .context("allocate preview frame")?;
        rgb.data_bytes_mut()
            .context("map preview frame")?
            .copy_from_slice(image.as_raw());
        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)
            .context("convert preview frame")?;

        highgui::imshow(title, &bgr).with_context(|| format!("show window {}", title))?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        let code = highgui::poll_key().context("poll key")?;
        Ok(key_from_code(code))
    }

    fn wait_key(&mut self) -> Result<Option<char>> {
        if self.windows.is_empty() {
            return Ok(None);
        }
        let code = highgui::wait_key(0).context("wait key")?;
        Ok(key_from_code(code))
    }

    fn close(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            log::warn!("failed to close preview windows: {}", err);
        }
        self.windows.clear();
    }
}

fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        return None;
    }
    char::from_u32((code & 0xFF) as u32)
}
