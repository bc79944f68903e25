use image::RgbImage;

/// One labeled bounding box reported by the vision service.
///
/// Coordinates are pixels in the analysed image, top-left origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub label: String,
    /// Service confidence in [0, 1].
    pub confidence: f32,
}

/// Outcome of analysing one image.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    pub person_detected: bool,
    pub person_count: usize,
    /// Person detections that survived the label filter, in service order.
    pub persons: Vec<Detection>,
    /// Annotated copy of the input. `None` only when the image could not be
    /// loaded; unannotated when the service failed.
    pub annotated: Option<RgbImage>,
}

impl DetectionResult {
    /// Result for an image that could not be loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result for a loaded image the service could not analyse.
    pub fn unanalysed(original: RgbImage) -> Self {
        Self {
            annotated: Some(original),
            ..Self::default()
        }
    }

    pub(crate) fn from_persons(persons: Vec<Detection>, annotated: RgbImage) -> Self {
        Self {
            person_detected: !persons.is_empty(),
            person_count: persons.len(),
            persons,
            annotated: Some(annotated),
        }
    }
}
