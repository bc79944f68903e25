pub mod azure;
pub mod stub;

pub use azure::AzureVision;
pub use stub::StaticVision;
