//! Image ingestion pipeline.
//!
//! A client data URL goes through six stages, each failing fast with its own
//! [`IngestError`] variant:
//!
//! 1. [`sanitize`]: data URL syntax, MIME allow-list, base64 repair.
//! 2. [`decode`]: base64 to bytes, with size bounds.
//! 3. [`recover`]: open the bytes as an image via ordered fallback strategies.
//! 4. [`color`]: map the pixel layout onto L, LA, RGB or RGBA.
//! 5. [`resize`]: best-effort aspect-preserving downsample.
//! 6. [`encode`]: PNG when alpha or a PNG source is involved, JPEG otherwise.
//!
//! [`ingest::ingest_data_url`] chains all of them. Fallbacks never cross
//! stage boundaries.

pub mod color;
pub mod decode;
pub mod encode;
mod error;
pub mod ingest;
pub mod recover;
pub mod resize;
pub mod sanitize;

pub use error::IngestError;
pub use ingest::{IngestOutcome, ingest_data_url};
pub use recover::RecoveryStrategy;
