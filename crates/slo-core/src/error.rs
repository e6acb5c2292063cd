//! Error taxonomy for planning, segment processing and manifest submission.
//!
//! Segment-level failures (`SegmentError`) never cross a worker boundary as
//! a panic or early return; they are captured in the segment's result and
//! aggregated once by the coordinator into `UploadError::UploadFailed`.

use std::io;
use std::path::PathBuf;

use crate::store::StoreError;

/// Failure of a single segment. Recorded as that segment's `Failed` status.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// Reading the source range or writing the local segment file failed.
    #[error("segment I/O: {0}")]
    Io(#[source] io::Error),
    /// The object store rejected or failed the segment PUT.
    #[error("segment upload: {0}")]
    Upload(#[source] StoreError),
    /// The disk budget gate handed out more units than it holds.
    #[error("disk budget exhausted: {in_use} in use, capacity {capacity}")]
    BudgetExhausted { in_use: usize, capacity: usize },
}

/// Fatal error for a whole upload run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Bad plan or option parameters. No I/O has been attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The source file could not be opened or inspected.
    #[error("source file {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The run temp directory could not be created.
    #[error("temp directory {}: {source}", .path.display())]
    TempDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Creating the segments container failed.
    #[error("create container {container}: {source}")]
    Container {
        container: String,
        #[source]
        source: StoreError,
    },
    /// One or more segments failed; lists every failed index in ascending order.
    #[error("upload failed for segment(s) {}", format_indices(.failed))]
    UploadFailed { failed: Vec<usize> },
    /// Every segment is stored remotely but the manifest PUT failed.
    #[error("manifest upload failed: {0}")]
    ManifestUploadFailed(#[source] StoreError),
    /// Gate accounting violation; indicates a bug, never a user error.
    #[error("disk budget exhausted: {in_use} in use, capacity {capacity}")]
    DiskBudgetExhausted { in_use: usize, capacity: usize },
    /// A worker thread panicked before reporting all of its results.
    #[error("segment worker panicked ({missing} segment result(s) missing)")]
    WorkerPanicked { missing: usize },
}

fn format_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
