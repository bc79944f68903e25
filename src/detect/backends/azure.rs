//! Azure Computer Vision v3.2 `analyze` client.
//!
//! One synchronous POST per image:
//! `{endpoint}/vision/v3.2/analyze?visualFeatures=Objects&language=<lang>&detectOrientation=true`
//! with the raw file bytes as an `application/octet-stream` body and the
//! subscription key in `Ocp-Apim-Subscription-Key`.

use serde::Deserialize;
use std::io::Read;
use url::Url;

use crate::config::VisionConfig;
use crate::detect::backend::VisionService;
use crate::detect::result::Detection;
use crate::error::RemoteServiceError;

pub const ANALYZE_PATH: &str = "vision/v3.2/analyze";
pub const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

const MAX_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    objects: Vec<AnalyzedObject>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedObject {
    object: String,
    rectangle: ObjectRectangle,
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct ObjectRectangle {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

/// Azure vision endpoint client. Holds one `ureq` agent for its lifetime.
pub struct AzureVision {
    agent: ureq::Agent,
    target: Result<Url, String>,
    key: String,
}

impl AzureVision {
    /// Build a client from validated settings.
    ///
    /// An empty or unparsable endpoint is not an error here: every `analyze`
    /// call then fails with `RemoteServiceError::Config`.
    pub fn new(config: &VisionConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let target = analyze_url(&config.endpoint, &config.language);
        if let Err(reason) = &target {
            log::warn!("vision service disabled: {}", reason);
        }
        Self {
            agent,
            target,
            key: config.key.clone(),
        }
    }

    /// The full request URL, when the endpoint is usable.
    pub fn url(&self) -> Option<&Url> {
        self.target.as_ref().ok()
    }
}

impl VisionService for AzureVision {
    fn name(&self) -> &'static str {
        "azure-vision"
    }

    fn analyze(&self, image_bytes: &[u8]) -> Result<Vec<Detection>, RemoteServiceError> {
        let url = self
            .target
            .as_ref()
            .map_err(|reason| RemoteServiceError::Config(reason.clone()))?;

        log::debug!("posting {} bytes to {}", image_bytes.len(), url.path());
        let response = self
            .agent
            .post(url.as_str())
            .set("Content-Type", "application/octet-stream")
            .set(KEY_HEADER, &self.key)
            .send_bytes(image_bytes);

        match response {
            Ok(response) => {
                let mut body = String::new();
                response
                    .into_reader()
                    .take(MAX_RESPONSE_BYTES)
                    .read_to_string(&mut body)
                    .map_err(|err| RemoteServiceError::Body(Box::new(err)))?;
                parse_analyze_response(&body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(RemoteServiceError::Status {
                    status,
                    body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                })
            }
            Err(err) => Err(RemoteServiceError::Transport(Box::new(err))),
        }
    }
}

/// Build the analyze URL for an endpoint and response language.
pub fn analyze_url(endpoint: &str, language: &str) -> Result<Url, String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err("VISION_ENDPOINT is empty".to_string());
    }
    let base = if endpoint.ends_with('/') {
        endpoint.to_string()
    } else {
        format!("{}/", endpoint)
    };
    let mut url = Url::parse(&base)
        .and_then(|base| base.join(ANALYZE_PATH))
        .map_err(|err| format!("invalid vision endpoint {}: {}", endpoint, err))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "unsupported vision endpoint scheme '{}'; expected http(s)",
            url.scheme()
        ));
    }
    url.query_pairs_mut()
        .append_pair("visualFeatures", "Objects")
        .append_pair("language", language)
        .append_pair("detectOrientation", "true");
    Ok(url)
}

/// Parse an analyze response body into unfiltered detections.
///
/// A body without an `objects` key is an empty result, not an error.
pub fn parse_analyze_response(body: &str) -> Result<Vec<Detection>, RemoteServiceError> {
    let response: AnalyzeResponse =
        serde_json::from_str(body).map_err(|err| RemoteServiceError::Body(Box::new(err)))?;
    Ok(response
        .objects
        .into_iter()
        .map(|object| Detection {
            x: clamp_coord(object.rectangle.x),
            y: clamp_coord(object.rectangle.y),
            width: clamp_coord(object.rectangle.w),
            height: clamp_coord(object.rectangle.h),
            label: object.object,
            confidence: object.confidence.clamp(0.0, 1.0),
        })
        .collect())
}

/// Pixel coordinates are kept within `0..=i32::MAX`, the range the drawing
/// code can address.
fn clamp_coord(value: i64) -> u32 {
    value.clamp(0, i32::MAX as i64) as u32
}
