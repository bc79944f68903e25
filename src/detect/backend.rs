use crate::error::RemoteServiceError;

use super::result::Detection;

/// A remote object-detection service.
///
/// Implementations receive the encoded image file exactly as stored on disk
/// and return every object the service reports, unfiltered. They do not
/// retry, cache, or decide what a failure means for the caller.
pub trait VisionService {
    /// Service identifier for logs.
    fn name(&self) -> &'static str;

    /// Analyse one encoded image.
    fn analyze(&self, image_bytes: &[u8]) -> Result<Vec<Detection>, RemoteServiceError>;
}

impl<T: VisionService + ?Sized> VisionService for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn analyze(&self, image_bytes: &[u8]) -> Result<Vec<Detection>, RemoteServiceError> {
        (**self).analyze(image_bytes)
    }
}
