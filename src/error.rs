//! Typed failures for the capture session and the detection client.
//!
//! Capture failures are fatal to the session and propagate to the caller.
//! Detection failures never leave `DetectionClient::detect`; they are logged
//! and folded into an empty or unannotated result there.

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The camera could not be opened. No retry is attempted.
    #[error("camera {device} unavailable")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: BoxError,
    },

    /// A frame read failed; the device is assumed disconnected.
    #[error("failed to read frame {frame} from {device}")]
    FrameRead {
        device: String,
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("failed to write capture {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("preview failed")]
    Preview(#[source] BoxError),
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("failed to load image {}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Failure talking to the remote vision endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("vision service not configured: {0}")]
    Config(String),

    #[error("vision service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("vision service unreachable")]
    Transport(#[source] BoxError),

    #[error("malformed vision response")]
    Body(#[source] BoxError),
}

impl RemoteServiceError {
    /// HTTP status code, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
