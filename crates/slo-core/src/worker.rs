//! Segment worker: materialize one byte range locally, upload it, delete it.

use std::path::Path;
use std::sync::Arc;

use crate::budget::DiskBudgetGate;
use crate::coordinator::{SegmentResult, SegmentStatus};
use crate::error::SegmentError;
use crate::planner::{SegmentJob, UploadPlan};
use crate::storage::{SegmentDir, SourceFile};
use crate::store::{ObjectStore, PutResponse};

/// Everything one worker thread needs. Cheap to clone; one clone per thread.
#[derive(Clone)]
pub struct SegmentWorker {
    plan: Arc<UploadPlan>,
    source: SourceFile,
    dir: SegmentDir,
    store: Arc<dyn ObjectStore>,
    gate: Arc<DiskBudgetGate>,
}

impl SegmentWorker {
    pub fn new(
        plan: Arc<UploadPlan>,
        source: SourceFile,
        dir: SegmentDir,
        store: Arc<dyn ObjectStore>,
        gate: Arc<DiskBudgetGate>,
    ) -> Self {
        Self {
            plan,
            source,
            dir,
            store,
            gate,
        }
    }

    /// Process one job to a terminal result. Never panics on I/O or upload
    /// failure; those become `SegmentStatus::Failed`.
    ///
    /// The local file is deleted before the disk budget unit is released, on
    /// every path.
    pub fn process(&self, mut job: SegmentJob) -> SegmentResult {
        let remote_object_path = self.plan.segment_remote_path(job.index);

        let permit = match self.gate.acquire() {
            Ok(p) => p,
            Err(e) => return SegmentResult::failed(job.index, remote_object_path, e),
        };

        let local = self.dir.segment_path(job.index);
        job.local_path = Some(local.clone());
        let outcome = self.materialize_and_upload(&job, &local);

        if let Err(e) = self.dir.delete_segment(&local) {
            tracing::warn!(
                index = job.index,
                path = %local.display(),
                "could not delete local segment: {}",
                e
            );
        }
        job.local_path = None;
        drop(permit);

        match outcome {
            Ok(PutResponse { size_bytes, etag }) => {
                tracing::debug!(index = job.index, size_bytes, %etag, "segment uploaded");
                SegmentResult {
                    index: job.index,
                    remote_object_path,
                    status: SegmentStatus::Succeeded { size_bytes, etag },
                }
            }
            Err(e) => {
                tracing::error!(index = job.index, "segment failed: {}", e);
                SegmentResult::failed(job.index, remote_object_path, e)
            }
        }
    }

    fn materialize_and_upload(
        &self,
        job: &SegmentJob,
        local: &Path,
    ) -> Result<PutResponse, SegmentError> {
        self.source
            .copy_range_to(job.byte_offset, job.byte_length, local)
            .map_err(SegmentError::Io)?;
        self.store
            .put_object(
                &self.plan.segments_container,
                &self.plan.segment_object(job.index),
                local,
            )
            .map_err(SegmentError::Upload)
    }
}
