//! Upload coordinator.
//!
//! Owns one upload run end to end: creates the segments container and the
//! run directory, sizes the worker pool from the disk budget, dispatches
//! segment jobs, and hands a complete, index-ordered result set to the
//! manifest assembler.

mod pool;
mod result;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::budget::{DiskBudget, DiskBudgetGate};
use crate::error::UploadError;
use crate::manifest;
use crate::planner::UploadPlan;
use crate::progress::ProgressStats;
use crate::storage::{SegmentDir, SourceFile};
use crate::store::ObjectStore;
use crate::worker::SegmentWorker;

pub use result::{SegmentResult, SegmentStatus};

/// Drives one planned upload to a stored manifest or a fatal error.
pub struct UploadCoordinator {
    plan: Arc<UploadPlan>,
    source: SourceFile,
    store: Arc<dyn ObjectStore>,
    temp_dir: PathBuf,
    budget: DiskBudget,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
}

impl UploadCoordinator {
    pub fn new(
        plan: UploadPlan,
        source: SourceFile,
        store: Arc<dyn ObjectStore>,
        temp_dir: &Path,
        budget: DiskBudget,
    ) -> Self {
        Self {
            plan: Arc::new(plan),
            source,
            store,
            temp_dir: temp_dir.to_path_buf(),
            budget,
            progress_tx: None,
        }
    }

    /// Send a progress snapshot after every uploaded segment.
    pub fn with_progress(mut self, tx: tokio::sync::mpsc::Sender<ProgressStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn plan(&self) -> &UploadPlan {
        &self.plan
    }

    /// Worker count after the disk ceiling was applied.
    pub fn budget(&self) -> &DiskBudget {
        &self.budget
    }

    /// Upload all segments and return their results in index order.
    ///
    /// The run directory is returned alongside so the caller decides when to
    /// remove it; on error it is left in place.
    pub fn upload_segments(&self) -> Result<(Vec<SegmentResult>, SegmentDir), UploadError> {
        let plan = &self.plan;
        self.store
            .create_container(&plan.segments_container)
            .map_err(|source| UploadError::Container {
                container: plan.segments_container.clone(),
                source,
            })?;

        let dir = SegmentDir::create(&self.temp_dir).map_err(|source| UploadError::TempDir {
            path: SegmentDir::run_path(&self.temp_dir),
            source,
        })?;

        let workers = self.budget.max_concurrent_segments;
        if self.budget.is_disk_limited(plan.segment_count) {
            tracing::info!(
                requested = self.budget.requested_concurrency,
                workers,
                "disk space ceiling lowers concurrency"
            );
        }
        tracing::info!(
            total_size = plan.total_size,
            segment_size = plan.segment_size,
            segment_count = plan.segment_count,
            workers,
            dir = %dir.path().display(),
            "uploading segments"
        );

        let gate = Arc::new(DiskBudgetGate::new(workers));
        let worker = SegmentWorker::new(
            Arc::clone(&self.plan),
            self.source.clone(),
            dir.clone(),
            Arc::clone(&self.store),
            Arc::clone(&gate),
        );
        let results = pool::run_pool(
            &worker,
            plan.jobs(),
            workers,
            plan.total_size,
            self.progress_tx.as_ref(),
        );
        tracing::debug!(high_water = gate.high_water(), capacity = gate.capacity(), "disk budget");

        match results {
            Ok(results) => Ok((results, dir)),
            Err(e) => {
                tracing::error!(dir = %dir.path().display(), "upload failed, leaving run directory: {}", e);
                Err(e)
            }
        }
    }

    /// Upload every segment, then the manifest. Returns the manifest path.
    ///
    /// The run directory is removed only after the manifest is acknowledged.
    pub fn run(self) -> Result<String, UploadError> {
        let (results, dir) = self.upload_segments()?;
        let entries = manifest::build_manifest(&self.plan, &results)?;
        let manifest_path = manifest::submit_manifest(self.store.as_ref(), &self.plan, &entries)?;

        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.remove() {
            tracing::warn!(dir = %dir_path.display(), "could not remove run directory: {}", e);
        }
        Ok(manifest_path)
    }
}
