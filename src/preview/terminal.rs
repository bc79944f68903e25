use anyhow::Result;
use image::RgbImage;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use super::{KeyBindings, Preview};

const FRAME_LOG_INTERVAL: u64 = 300;

/// Window-less preview for headless hosts and SSH sessions.
///
/// Each line typed on the input is one key press: an empty line or `space`
/// is the capture key, otherwise the line's first character. Lines are read
/// on a helper thread so `poll_key` never blocks the capture loop.
pub struct TerminalPreview {
    keys: Receiver<char>,
    announced: HashSet<String>,
    frames_shown: u64,
}

impl TerminalPreview {
    pub fn stdin(bindings: KeyBindings) -> Self {
        Self::from_reader(std::io::stdin(), bindings)
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R, bindings: KeyBindings) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("captura-keys".to_string())
            .spawn(move || {
                for line in BufReader::new(reader).lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if tx.send(line_to_key(&line, bindings)).is_err() {
                        break;
                    }
                }
            });
        if let Err(err) = spawned {
            log::warn!("terminal preview: key reader unavailable: {}", err);
        }
        Self {
            keys: rx,
            announced: HashSet::new(),
            frames_shown: 0,
        }
    }
}

impl Preview for TerminalPreview {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        if self.announced.insert(title.to_string()) {
            log::info!(
                "{} ({}x{}): Enter = capture, q + Enter = quit",
                title,
                image.width(),
                image.height()
            );
        }
        self.frames_shown += 1;
        if self.frames_shown % FRAME_LOG_INTERVAL == 0 {
            log::debug!("terminal preview: {} frames shown", self.frames_shown);
        }
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        match self.keys.try_recv() {
            Ok(key) => Ok(Some(key)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn wait_key(&mut self) -> Result<Option<char>> {
        Ok(self.keys.recv().ok())
    }

    fn close(&mut self) {
        log::debug!(
            "terminal preview closed after {} frames",
            self.frames_shown
        );
    }
}

fn line_to_key(line: &str, bindings: KeyBindings) -> char {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("space") {
        bindings.capture
    } else {
        trimmed.chars().next().unwrap_or(bindings.capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_map_to_keys() {
        let keys = KeyBindings::default();
        assert_eq!(line_to_key("", keys), ' ');
        assert_eq!(line_to_key("  SPACE ", keys), ' ');
        assert_eq!(line_to_key("q", keys), 'q');
        assert_eq!(line_to_key("quit", keys), 'q');
    }

    #[test]
    fn wait_key_reads_lines_in_order() -> Result<()> {
        let input = std::io::Cursor::new(b"\nq\n".to_vec());
        let mut preview = TerminalPreview::from_reader(input, KeyBindings::default());

        assert_eq!(preview.wait_key()?, Some(' '));
        assert_eq!(preview.wait_key()?, Some('q'));
        assert_eq!(preview.wait_key()?, None);
        assert_eq!(preview.poll_key()?, None);
        Ok(())
    }
}
