pub mod config;
#[cfg(feature = "imaging")]
pub mod imaging;
pub mod storage;

pub use config::{ImagingConfig, StorageConfig};
