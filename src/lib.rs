//! captura: camera stills with remote person detection.
//!
//! # Architecture
//!
//! Two components, run one after the other:
//!
//! 1. **Capture loop** (`capture`): reads frames from a camera, shows them in
//!    a preview, writes the current frame to `capturas/captura_<timestamp>.jpg`
//!    on the capture key, stops on the quit key or when the camera fails.
//! 2. **Detection client** (`detect`): posts a saved image's bytes to a
//!    remote vision endpoint, keeps the person-like detections, and draws
//!    boxes plus a summary caption on a copy of the image.
//!
//! `pipeline` joins the two: detection can run as a hook after each capture,
//! or directly on an existing file.
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB frames
//! - `ingest`: frame sources (synthetic, V4L2)
//! - `preview`: windows and key input (terminal, OpenCV highgui)
//! - `capture`: the capture loop and its release guard
//! - `detect`: vision service seam, Azure client, label filter, results
//! - `annotate`: box, label and caption drawing
//! - `storage`: output file naming
//! - `config`, `ui`, `error`: settings, progress output, typed failures

pub mod annotate;
pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod preview;
pub mod storage;
pub mod ui;

pub use capture::{CaptureHook, CaptureLoop, CaptureSettings, CaptureSummary};
pub use config::{CapturaConfig, OutputSettings, VisionConfig};
pub use detect::{
    AzureVision, Detection, DetectionClient, DetectionResult, LabelFilter, StaticVision,
    VisionService,
};
pub use error::{CaptureError, DetectError, RemoteServiceError};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, FrameSource};
pub use pipeline::{analyze_file, AnalysisReport, DetectOnCapture};
pub use preview::{open_preview, Key, KeyBindings, Preview, PreviewKind, TerminalPreview};
pub use ui::Ui;
