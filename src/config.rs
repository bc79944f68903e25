use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::CameraConfig;
use crate::preview::KeyBindings;
use crate::storage::{DEFAULT_ANALYSIS_DIR, DEFAULT_CAPTURE_DIR};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_LANGUAGE: &str = "es";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const SETUP_INSTRUCTIONS: &str = "\
vision service not configured; running in demo mode (every analysis will report no persons).
To enable detection:
  1. create a Computer Vision resource in the Azure portal
  2. copy its endpoint and one of its keys
  3. export VISION_ENDPOINT=https://<resource>.cognitiveservices.azure.com/
     export VISION_KEY=<key>
     (or set vision.endpoint / vision.key in the file named by CAPTURA_CONFIG)";

#[derive(Debug, Deserialize, Default)]
struct CapturaConfigFile {
    camera: Option<CameraConfigFile>,
    vision: Option<VisionConfigFile>,
    output: Option<OutputConfigFile>,
    keys: Option<KeyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    endpoint: Option<String>,
    key: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    capture_dir: Option<PathBuf>,
    analysis_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct KeyConfigFile {
    capture: Option<char>,
    quit: Option<char>,
}

#[derive(Debug, Clone)]
pub struct CapturaConfig {
    pub camera: CameraConfig,
    pub vision: VisionConfig,
    pub output: OutputSettings,
    pub keys: KeyBindings,
}

/// Settings for the remote vision endpoint.
#[derive(Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub key: String,
    pub language: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub capture_dir: PathBuf,
    pub analysis_dir: PathBuf,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl VisionConfig {
    /// Both endpoint and key are set. When false the client still runs and
    /// every analysis degrades to "no persons".
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.key.trim().is_empty()
    }
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &if self.key.is_empty() { "" } else { "<redacted>" })
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CapturaConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CAPTURA_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CapturaConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_FPS),
            width: camera_file.width.unwrap_or(DEFAULT_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_HEIGHT),
        };

        let vision_file = file.vision.unwrap_or_default();
        let vision = VisionConfig {
            endpoint: vision_file.endpoint.unwrap_or_default(),
            key: vision_file.key.unwrap_or_default(),
            language: vision_file
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            timeout: Duration::from_secs(
                vision_file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        let output_file = file.output.unwrap_or_default();
        let output = OutputSettings {
            capture_dir: output_file
                .capture_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_DIR)),
            analysis_dir: output_file
                .analysis_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ANALYSIS_DIR)),
        };

        let defaults = KeyBindings::default();
        let keys_file = file.keys.unwrap_or_default();
        let keys = KeyBindings {
            capture: keys_file.capture.unwrap_or(defaults.capture),
            quit: keys_file.quit.unwrap_or(defaults.quit),
        };

        Self {
            camera,
            vision,
            output,
            keys,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("VISION_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.vision.endpoint = endpoint;
            }
        }
        if let Ok(key) = std::env::var("VISION_KEY") {
            if !key.trim().is_empty() {
                self.vision.key = key;
            }
        }
        if let Ok(language) = std::env::var("VISION_LANGUAGE") {
            if !language.trim().is_empty() {
                self.vision.language = language;
            }
        }
        if let Ok(timeout) = std::env::var("VISION_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("VISION_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.vision.timeout = Duration::from_secs(seconds);
        }
        if let Ok(device) = std::env::var("CAPTURA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(dir) = std::env::var("CAPTURA_CAPTURE_DIR") {
            if !dir.trim().is_empty() {
                self.output.capture_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("CAPTURA_ANALYSIS_DIR") {
            if !dir.trim().is_empty() {
                self.output.analysis_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    /// Check invariants. Called once at startup, after every override.
    pub fn validate(&mut self) -> Result<()> {
        self.vision.endpoint = self.vision.endpoint.trim().to_string();
        self.vision.key = self.vision.key.trim().to_string();

        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.vision.timeout.is_zero() {
            return Err(anyhow!("vision timeout must be greater than zero"));
        }
        if self.vision.language.trim().is_empty() {
            return Err(anyhow!("vision language must not be empty"));
        }
        if self.keys.capture.eq_ignore_ascii_case(&self.keys.quit) {
            return Err(anyhow!(
                "capture and quit keys must differ (both {:?})",
                self.keys.quit
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CapturaConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unconfigured_but_valid() {
        let mut cfg = CapturaConfig::from_file(CapturaConfigFile::default());
        cfg.validate().unwrap();
        assert!(!cfg.vision.is_configured());
        assert_eq!(cfg.camera.device, DEFAULT_DEVICE);
        assert_eq!(cfg.output.capture_dir, PathBuf::from("capturas"));
        assert_eq!(cfg.keys, KeyBindings::default());
    }

    #[test]
    fn whitespace_only_settings_are_unconfigured() {
        let vision = VisionConfig {
            endpoint: "  ".to_string(),
            key: "abc".to_string(),
            ..VisionConfig::default()
        };
        assert!(!vision.is_configured());
    }

    #[test]
    fn rejects_identical_keys() {
        let mut cfg = CapturaConfig::from_file(CapturaConfigFile::default());
        cfg.keys.capture = 'q';
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_capture_key_that_differs_from_quit_only_by_case() {
        let mut cfg = CapturaConfig::from_file(CapturaConfigFile::default());
        cfg.keys.capture = 'Q';
        assert_eq!(cfg.keys.classify('Q'), crate::preview::Key::Quit);
        assert!(cfg.validate().is_err());

        cfg.keys.capture = 'c';
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_key() {
        let vision = VisionConfig {
            key: "secret-key".to_string(),
            ..VisionConfig::default()
        };
        let rendered = format!("{:?}", vision);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
