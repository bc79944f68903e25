use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use captura::config::CapturaConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CAPTURA_CONFIG",
        "CAPTURA_DEVICE",
        "CAPTURA_CAPTURE_DIR",
        "CAPTURA_ANALYSIS_DIR",
        "VISION_ENDPOINT",
        "VISION_KEY",
        "VISION_LANGUAGE",
        "VISION_TIMEOUT_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "device": "/dev/video2",
            "target_fps": 15,
            "width": 1280,
            "height": 720
        },
        "vision": {
            "endpoint": "https://file.cognitiveservices.azure.com/",
            "key": "file-key",
            "language": "en",
            "timeout_secs": 10
        },
        "output": {
            "capture_dir": "/tmp/shots"
        },
        "keys": {
            "capture": "c",
            "quit": "x"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("CAPTURA_CONFIG", file.path());
    std::env::set_var("VISION_KEY", "  env-key  ");
    std::env::set_var("VISION_TIMEOUT_SECS", "45");
    std::env::set_var("CAPTURA_ANALYSIS_DIR", "/tmp/reports");

    let cfg = CapturaConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.vision.endpoint, "https://file.cognitiveservices.azure.com/");
    assert_eq!(cfg.vision.key, "env-key");
    assert_eq!(cfg.vision.language, "en");
    assert_eq!(cfg.vision.timeout, Duration::from_secs(45));
    assert!(cfg.vision.is_configured());
    assert_eq!(cfg.output.capture_dir, PathBuf::from("/tmp/shots"));
    assert_eq!(cfg.output.analysis_dir, PathBuf::from("/tmp/reports"));
    assert_eq!((cfg.keys.capture, cfg.keys.quit), ('c', 'x'));

    clear_env();
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = CapturaConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.vision.language, "es");
    assert_eq!(cfg.vision.timeout, Duration::from_secs(30));
    assert!(!cfg.vision.is_configured());
    assert_eq!(cfg.output.capture_dir, PathBuf::from("capturas"));
    assert_eq!(cfg.output.analysis_dir, PathBuf::from("analisis"));
    assert_eq!((cfg.keys.capture, cfg.keys.quit), (' ', 'q'));
}

#[test]
fn blank_credentials_leave_service_unconfigured() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("VISION_ENDPOINT", "https://example.cognitiveservices.azure.com/");
    std::env::set_var("VISION_KEY", "   ");

    let cfg = CapturaConfig::load().expect("load config");
    assert!(!cfg.vision.is_configured());

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("VISION_TIMEOUT_SECS", "soon");
    assert!(CapturaConfig::load().is_err());

    std::env::set_var("VISION_TIMEOUT_SECS", "0");
    assert!(CapturaConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"camera": {"target_fps": 0}}"#)
        .expect("write config");
    std::env::set_var("CAPTURA_CONFIG", file.path());
    assert!(CapturaConfig::load().is_err());

    std::io::Write::write_all(&mut file, b"{ not json").expect("append garbage");
    assert!(CapturaConfig::load().is_err());

    clear_env();
}
