use std::cell::Cell;

use crate::detect::backend::VisionService;
use crate::detect::result::Detection;
use crate::error::RemoteServiceError;

/// Canned vision service. Answers every call with the same detections, or
/// the same HTTP status when built with `failing`.
pub struct StaticVision {
    reply: Result<Vec<Detection>, u16>,
    calls: Cell<usize>,
}

impl StaticVision {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            reply: Ok(detections),
            calls: Cell::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: Cell::new(0),
        }
    }

    /// Number of `analyze` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl VisionService for StaticVision {
    fn name(&self) -> &'static str {
        "static"
    }

    fn analyze(&self, _image_bytes: &[u8]) -> Result<Vec<Detection>, RemoteServiceError> {
        self.calls.set(self.calls.get() + 1);
        match &self.reply {
            Ok(detections) => Ok(detections.clone()),
            Err(status) => Err(RemoteServiceError::Status {
                status: *status,
                body: String::new(),
            }),
        }
    }
}
