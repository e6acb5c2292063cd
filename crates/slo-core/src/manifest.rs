//! Static Large Object manifest assembly and submission.

use serde::{Deserialize, Serialize};

use crate::coordinator::{SegmentResult, SegmentStatus};
use crate::error::UploadError;
use crate::planner::UploadPlan;
use crate::store::{ObjectStore, StoreError};

/// One manifest entry, in the shape Swift's `multipart-manifest=put` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `/<segments_container>/<object>`.
    pub path: String,
    pub etag: String,
    pub size_bytes: u64,
}

/// Build manifest entries from segment results.
///
/// Results may arrive in any order; entries are always emitted in index order.
/// Fails unless the results are exactly indices `0..segment_count`, all succeeded.
pub fn build_manifest(
    plan: &UploadPlan,
    results: &[SegmentResult],
) -> Result<Vec<ManifestEntry>, UploadError> {
    let mut ordered: Vec<&SegmentResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);

    if ordered.len() != plan.segment_count {
        return Err(UploadError::InvalidInput(format!(
            "manifest needs {} segment results, got {}",
            plan.segment_count,
            ordered.len()
        )));
    }

    let mut entries = Vec::with_capacity(ordered.len());
    for (expected, result) in ordered.into_iter().enumerate() {
        if result.index != expected {
            return Err(UploadError::InvalidInput(format!(
                "segment results are not contiguous: expected index {}, found {}",
                expected, result.index
            )));
        }
        match &result.status {
            SegmentStatus::Succeeded { size_bytes, etag } => entries.push(ManifestEntry {
                path: format!("/{}", result.remote_object_path),
                etag: etag.clone(),
                size_bytes: *size_bytes,
            }),
            SegmentStatus::Failed(e) => {
                return Err(UploadError::InvalidInput(format!(
                    "segment {} failed and cannot be referenced: {}",
                    result.index, e
                )));
            }
        }
    }
    Ok(entries)
}

/// Encode entries as the JSON document Swift stores for the manifest.
pub fn to_json(entries: &[ManifestEntry]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(entries)?)
}

/// Submit the manifest for `plan` and return its path (`<container>/<object_name>`).
pub fn submit_manifest(
    store: &dyn ObjectStore,
    plan: &UploadPlan,
    entries: &[ManifestEntry],
) -> Result<String, UploadError> {
    store
        .put_manifest(&plan.container, &plan.object_name, entries)
        .map_err(UploadError::ManifestUploadFailed)?;
    let path = plan.manifest_path();
    tracing::info!(manifest = %path, segments = entries.len(), "manifest stored");
    Ok(path)
}
