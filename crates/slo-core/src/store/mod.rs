//! Object-store interface consumed by the upload core, plus the Swift
//! implementation used by the CLI.

mod error;
#[cfg(test)]
pub(crate) mod fake;
mod swift;

use std::path::Path;

use crate::manifest::ManifestEntry;

pub use error::StoreError;
pub use swift::{HttpOptions, SwiftClient};

/// What the store reports back for a stored segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    pub size_bytes: u64,
    pub etag: String,
}

/// Remote object storage as seen by the upload core.
///
/// Implementations are shared across segment worker threads.
pub trait ObjectStore: Send + Sync {
    /// Create `container`. Must succeed if it already exists.
    fn create_container(&self, container: &str) -> Result<(), StoreError>;

    /// Store the contents of the local file `source` as `object` in `container`.
    fn put_object(
        &self,
        container: &str,
        object: &str,
        source: &Path,
    ) -> Result<PutResponse, StoreError>;

    /// Store an SLO manifest as `object` in `container`.
    fn put_manifest(
        &self,
        container: &str,
        object: &str,
        entries: &[ManifestEntry],
    ) -> Result<(), StoreError>;
}
