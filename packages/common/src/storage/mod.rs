mod error;
mod handle;
mod hash;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use handle::BlobHandle;
pub use hash::ContentHash;
pub use traits::{BlobAttributes, BlobStore};
