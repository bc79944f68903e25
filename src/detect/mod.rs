mod backend;
pub mod backends;
mod client;
mod labels;
mod result;

pub use backend::VisionService;
pub use backends::{AzureVision, StaticVision};
pub use client::DetectionClient;
pub use labels::{LabelFilter, PERSON_LABELS};
pub use result::{Detection, DetectionResult};
