use std::path::PathBuf;

use serde::Deserialize;

const MIB: u64 = 1024 * 1024;

/// Blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the filesystem blob store. Default: "./data/blobs".
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
    /// Largest blob accepted by `put`, in bytes. Default: 100 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    100 * MIB
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_dir: default_blob_dir(),
            max_blob_size: default_max_blob_size(),
        }
    }
}

/// Image ingestion policy.
#[derive(Debug, Deserialize, Clone)]
pub struct ImagingConfig {
    /// MIME types accepted in data URLs.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Decoded payloads smaller than this are rejected. Default: 100 bytes.
    #[serde(default = "default_min_decoded_bytes")]
    pub min_decoded_bytes: usize,
    /// Decoded payloads larger than this are rejected. Default: 100 MiB.
    #[serde(default = "default_max_decoded_bytes")]
    pub max_decoded_bytes: usize,
    /// Longer side above which images are downsampled. Default: 1920.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// JPEG quality for opaque output. Default: 85.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Ceiling on the scratch buffer of the high-quality resampler. Default: 512 MiB.
    #[serde(default = "default_resample_budget_bytes")]
    pub resample_budget_bytes: u64,
}

fn default_allowed_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/jpg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/bmp",
        "image/tiff",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_min_decoded_bytes() -> usize {
    100
}
fn default_max_decoded_bytes() -> usize {
    100 * MIB as usize
}
fn default_max_dimension() -> u32 {
    1920
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_resample_budget_bytes() -> u64 {
    512 * MIB
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            allowed_types: default_allowed_types(),
            min_decoded_bytes: default_min_decoded_bytes(),
            max_decoded_bytes: default_max_decoded_bytes(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            resample_budget_bytes: default_resample_budget_bytes(),
        }
    }
}

impl ImagingConfig {
    pub fn is_allowed(&self, mime: &str) -> bool {
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(mime))
    }
}
