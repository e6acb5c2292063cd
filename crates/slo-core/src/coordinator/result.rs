//! Per-segment outcome reported by a worker.

use crate::error::SegmentError;

/// Terminal state of one segment.
#[derive(Debug)]
pub enum SegmentStatus {
    Succeeded { size_bytes: u64, etag: String },
    Failed(SegmentError),
}

/// Outcome of one segment job. Immutable once produced.
#[derive(Debug)]
pub struct SegmentResult {
    pub index: usize,
    /// `<segments_container>/<object>` of this segment.
    pub remote_object_path: String,
    pub status: SegmentStatus,
}

impl SegmentResult {
    pub fn failed(index: usize, remote_object_path: String, error: SegmentError) -> Self {
        Self {
            index,
            remote_object_path,
            status: SegmentStatus::Failed(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, SegmentStatus::Succeeded { .. })
    }

    /// Bytes stored remotely (0 for a failed segment).
    pub fn size_bytes(&self) -> u64 {
        match &self.status {
            SegmentStatus::Succeeded { size_bytes, .. } => *size_bytes,
            SegmentStatus::Failed(_) => 0,
        }
    }
}
