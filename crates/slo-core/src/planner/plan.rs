//! Upload plan: segment size and count under the provider's segment ceiling.

use crate::error::UploadError;

use super::range::{split_fixed, SegmentJob};

/// One mebibyte, the unit segment sizes are requested in.
pub const MIB: u64 = 1_048_576;

/// Swift's default `max_manifest_segments`.
pub const DEFAULT_MAX_SEGMENTS: usize = 1000;

/// Provider-imposed planning limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    /// Maximum number of segments a single manifest may reference.
    pub max_segments: usize,
    /// Smallest segment size accepted.
    pub min_segment_size: u64,
    /// A recomputed segment size is rounded up to a multiple of this.
    pub size_unit: u64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_segments: DEFAULT_MAX_SEGMENTS,
            min_segment_size: MIB,
            size_unit: MIB,
        }
    }
}

/// Immutable plan for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub total_size: u64,
    pub segment_size: u64,
    pub segment_count: usize,
    /// Container the manifest is written to.
    pub container: String,
    /// Container the segments are written to.
    pub segments_container: String,
    /// Manifest object name (the name the reassembled file is served under).
    pub object_name: String,
}

impl UploadPlan {
    /// The segment jobs for this plan, in index order.
    pub fn jobs(&self) -> Vec<SegmentJob> {
        split_fixed(self.total_size, self.segment_size)
    }

    /// Object name of segment `index` inside the segments container.
    ///
    /// Embeds the source size and segment size so segments of different uploads
    /// under the same object name never collide.
    pub fn segment_object(&self, index: usize) -> String {
        format!(
            "{}/{}/{}/{:08}",
            self.object_name, self.total_size, self.segment_size, index
        )
    }

    /// Path of segment `index` as referenced from the manifest: `<segments_container>/<object>`.
    pub fn segment_remote_path(&self, index: usize) -> String {
        format!("{}/{}", self.segments_container, self.segment_object(index))
    }

    /// Path of the manifest object: `<container>/<object_name>`.
    pub fn manifest_path(&self) -> String {
        format!("{}/{}", self.container, self.object_name)
    }
}

/// Builds an upload plan for a source of `total_size` bytes with the requested segment size.
///
/// When the requested size would need more than `limits.max_segments` segments, the
/// size is recomputed once as `ceil(total_size / max_segments)` rounded up to
/// `limits.size_unit`; that always fits because it targets the ceiling exactly.
pub fn plan_upload(
    total_size: u64,
    requested_segment_size: u64,
    limits: &PlanLimits,
    container: &str,
    segments_container: &str,
    object_name: &str,
) -> Result<UploadPlan, UploadError> {
    if total_size == 0 {
        return Err(UploadError::InvalidInput(
            "source file is empty; nothing to upload".to_string(),
        ));
    }
    if limits.max_segments == 0 {
        return Err(UploadError::InvalidInput(
            "provider segment limit must be at least 1".to_string(),
        ));
    }
    if requested_segment_size < limits.min_segment_size || requested_segment_size == 0 {
        return Err(UploadError::InvalidInput(format!(
            "segment size {} is below the minimum of {} bytes",
            requested_segment_size, limits.min_segment_size
        )));
    }

    let max_segments = limits.max_segments as u64;
    let mut segment_size = requested_segment_size;
    let mut segment_count = total_size.div_ceil(segment_size);

    if segment_count > max_segments {
        let unit = limits.size_unit.max(1);
        segment_size = total_size.div_ceil(max_segments).div_ceil(unit) * unit;
        segment_size = segment_size.max(limits.min_segment_size);
        segment_count = total_size.div_ceil(segment_size);
        tracing::info!(
            requested = requested_segment_size,
            segment_size,
            segment_count,
            max_segments,
            "requested segment size exceeds the segment limit; enlarged"
        );
    }

    Ok(UploadPlan {
        total_size,
        segment_size,
        segment_count: segment_count as usize,
        container: container.to_string(),
        segments_container: segments_container.to_string(),
        object_name: object_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(total: u64, requested: u64, limits: &PlanLimits) -> Result<UploadPlan, UploadError> {
        plan_upload(total, requested, limits, "backups", "backups_segments", "disk.img")
    }

    fn decimal_limits() -> PlanLimits {
        PlanLimits {
            max_segments: 1000,
            min_segment_size: 1_000_000,
            size_unit: 1_000_000,
        }
    }

    #[test]
    fn twelve_megabytes_in_one_megabyte_segments() {
        let p = plan(12_000_000, 1_000_000, &decimal_limits()).unwrap();
        assert_eq!(p.segment_count, 12);
        assert_eq!(p.segment_size, 1_000_000);
    }

    #[test]
    fn enlarges_segments_past_the_limit() {
        let p = plan(2_000_000_000, MIB, &PlanLimits::default()).unwrap();
        // naive count would be 1908
        assert_eq!(p.segment_size, 2 * MIB);
        assert_eq!(p.segment_count, 954);
        assert!(p.segment_count <= DEFAULT_MAX_SEGMENTS);
    }

    #[test]
    fn count_bounds_hold_across_sizes() {
        let limits = PlanLimits {
            max_segments: 7,
            min_segment_size: 1,
            size_unit: 3,
        };
        for total in 1..500u64 {
            for requested in [1u64, 2, 5, 64, 1000] {
                let p = plan(total, requested, &limits).unwrap();
                let count = p.segment_count as u64;
                assert!(count <= 7, "total={total} requested={requested}");
                assert!((count - 1) * p.segment_size < total);
                assert!(total <= count * p.segment_size);
                assert_eq!(p.jobs().len(), p.segment_count);
            }
        }
    }

    #[test]
    fn exact_fit_at_limit_is_not_enlarged() {
        let limits = PlanLimits {
            max_segments: 4,
            min_segment_size: 1,
            size_unit: 1,
        };
        let p = plan(400, 100, &limits).unwrap();
        assert_eq!(p.segment_size, 100);
        assert_eq!(p.segment_count, 4);
    }

    #[test]
    fn rejects_empty_source() {
        let err = plan(0, MIB, &PlanLimits::default()).unwrap_err();
        assert!(matches!(err, UploadError::InvalidInput(_)));
    }

    #[test]
    fn rejects_undersized_segments() {
        let err = plan(10 * MIB, MIB - 1, &PlanLimits::default()).unwrap_err();
        assert!(matches!(err, UploadError::InvalidInput(_)));
    }

    #[test]
    fn rejects_zero_segment_limit() {
        let limits = PlanLimits {
            max_segments: 0,
            ..PlanLimits::default()
        };
        let err = plan(10 * MIB, MIB, &limits).unwrap_err();
        assert!(matches!(err, UploadError::InvalidInput(_)));
    }

    #[test]
    fn segment_paths_embed_size_and_index() {
        let p = plan(12_000_000, 1_000_000, &decimal_limits()).unwrap();
        assert_eq!(p.segment_object(3), "disk.img/12000000/1000000/00000003");
        assert_eq!(
            p.segment_remote_path(3),
            "backups_segments/disk.img/12000000/1000000/00000003"
        );
        assert_eq!(p.manifest_path(), "backups/disk.img");
    }
}
