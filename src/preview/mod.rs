//! Live preview and key input.
//!
//! - `TerminalPreview`: no window; keys typed on stdin (default)
//! - `HighguiPreview`: OpenCV window (feature: preview-highgui)

#[cfg(feature = "preview-highgui")]
mod highgui;
mod terminal;

#[cfg(feature = "preview-highgui")]
pub use highgui::HighguiPreview;
pub use terminal::TerminalPreview;

use anyhow::{anyhow, Result};
use image::RgbImage;

pub const CAPTURE_TITLE: &str = "Camara - ESPACIO para capturar, Q para salir";
pub const RESULT_TITLE: &str = "Analisis";

/// A place to show frames and read single key presses from.
pub trait Preview {
    /// Display `image` in the window called `title`.
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()>;

    /// Return a pending key press, if any, without blocking.
    fn poll_key(&mut self) -> Result<Option<char>>;

    /// Block until a key is pressed. `None` when input is closed.
    fn wait_key(&mut self) -> Result<Option<char>>;

    /// Close every window. Called once by the capture session on exit.
    fn close(&mut self);
}

/// What a key press means to the capture loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Capture,
    Quit,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    pub capture: char,
    pub quit: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            capture: ' ',
            quit: 'q',
        }
    }
}

impl KeyBindings {
    /// Quit matches case-insensitively so caps lock does not trap the user.
    pub fn classify(&self, key: char) -> Key {
        if key.eq_ignore_ascii_case(&self.quit) {
            Key::Quit
        } else if key == self.capture {
            Key::Capture
        } else {
            Key::Other
        }
    }
}

/// Which preview backend to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewKind {
    Auto,
    Terminal,
    Highgui,
}

impl PreviewKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "auto" => Ok(PreviewKind::Auto),
            "terminal" => Ok(PreviewKind::Terminal),
            "highgui" => Ok(PreviewKind::Highgui),
            other => Err(anyhow!(
                "unknown preview '{}'; expected auto, terminal or highgui",
                other
            )),
        }
    }
}

/// Build the preview for `kind`. `Auto` prefers a window when compiled in.
pub fn open_preview(kind: PreviewKind, keys: KeyBindings) -> Result<Box<dyn Preview>> {
    match kind {
        PreviewKind::Terminal => Ok(Box::new(TerminalPreview::stdin(keys))),
        #[cfg(feature = "preview-highgui")]
        PreviewKind::Auto | PreviewKind::Highgui => Ok(Box::new(HighguiPreview::new())),
        #[cfg(not(feature = "preview-highgui"))]
        PreviewKind::Auto => Ok(Box::new(TerminalPreview::stdin(keys))),
        #[cfg(not(feature = "preview-highgui"))]
        PreviewKind::Highgui => Err(anyhow!(
            "highgui preview requires the preview-highgui feature"
        )),
    }
}

impl<P: Preview + ?Sized> Preview for Box<P> {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        (**self).show(title, image)
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        (**self).poll_key()
    }

    fn wait_key(&mut self) -> Result<Option<char>> {
        (**self).wait_key()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
