use std::path::Path;

use crate::annotate::annotate;
use crate::config::VisionConfig;
use crate::error::DetectError;

use super::backend::VisionService;
use super::backends::AzureVision;
use super::labels::LabelFilter;
use super::result::DetectionResult;

/// Sends saved images to a vision service and annotates the persons found.
///
/// Stateless across calls: every `detect` reads the file again and issues
/// exactly one request.
pub struct DetectionClient<V: VisionService = AzureVision> {
    service: V,
    filter: LabelFilter,
}

impl DetectionClient<AzureVision> {
    pub fn new(config: &VisionConfig) -> Self {
        Self::with_service(AzureVision::new(config))
    }
}

impl<V: VisionService> DetectionClient<V> {
    pub fn with_service(service: V) -> Self {
        Self {
            service,
            filter: LabelFilter::persons(),
        }
    }

    pub fn with_filter(mut self, filter: LabelFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn service(&self) -> &V {
        &self.service
    }

    /// Analyse the image at `path`.
    ///
    /// Never fails: an unreadable image yields `DetectionResult::empty()`, a
    /// remote failure yields the original image unannotated with no persons.
    pub fn detect(&self, path: &Path) -> DetectionResult {
        match self.try_detect(path) {
            Ok(result) => result,
            Err(err) => {
                log::error!("{:#}", anyhow::Error::new(err));
                DetectionResult::empty()
            }
        }
    }

    /// Like `detect`, but reports an unreadable image as an error.
    pub fn try_detect(&self, path: &Path) -> Result<DetectionResult, DetectError> {
        let image_load = |source: Box<dyn std::error::Error + Send + Sync>| DetectError::ImageLoad {
            path: path.to_path_buf(),
            source,
        };
        let bytes = std::fs::read(path).map_err(|err| image_load(Box::new(err)))?;
        let original = image::load_from_memory(&bytes)
            .map_err(|err| image_load(Box::new(err)))?
            .into_rgb8();

        let detections = match self.service.analyze(&bytes) {
            Ok(detections) => detections,
            Err(err) => {
                let status = err
                    .status()
                    .map(|status| format!(" (HTTP {})", status))
                    .unwrap_or_default();
                log::warn!(
                    "{} failed for {}{}: {:#}; treating as no detections",
                    self.service.name(),
                    path.display(),
                    status,
                    anyhow::Error::new(err)
                );
                return Ok(DetectionResult::unanalysed(original));
            }
        };

        let total = detections.len();
        let persons = self.filter.retain(detections);
        log::info!(
            "{}: {} objects, {} persons",
            path.display(),
            total,
            persons.len()
        );
        let annotated = annotate(&original, &persons);
        Ok(DetectionResult::from_persons(persons, annotated))
    }
}
