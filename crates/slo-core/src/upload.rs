//! Upload entry point: options, planning, and the outcome reported to callers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::budget::DiskBudget;
use crate::config::SloConfig;
use crate::coordinator::UploadCoordinator;
use crate::error::UploadError;
use crate::planner::{plan_upload, PlanLimits, MIB};
use crate::progress::ProgressStats;
use crate::storage::SourceFile;
use crate::store::ObjectStore;

/// Validated settings for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Container the manifest is stored in.
    pub container: String,
    /// Manifest object name; defaults to the source file name.
    pub object_name: Option<String>,
    /// Container for segments; defaults to `<container>_segments`.
    pub segments_container: Option<String>,
    /// Requested segment size in bytes. May be enlarged to respect `limits.max_segments`.
    pub segment_size: u64,
    /// Requested number of segments in flight.
    pub concurrency: usize,
    /// Ceiling on bytes of segment files on local disk at once. A ceiling below
    /// one segment (including 0) still lets one segment through at a time.
    pub max_disk_space: Option<u64>,
    /// Parent of the run directory.
    pub temp_dir: PathBuf,
    pub limits: PlanLimits,
}

impl UploadOptions {
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            object_name: None,
            segments_container: None,
            segment_size: MIB,
            concurrency: 10,
            max_disk_space: None,
            temp_dir: std::env::temp_dir(),
            limits: PlanLimits::default(),
        }
    }

    /// Options from the config file; sizes there are in MiB and a disk ceiling of 0 means none.
    pub fn from_config(cfg: &SloConfig, container: &str) -> Self {
        Self {
            container: container.to_string(),
            object_name: None,
            segments_container: Some(format!("{}{}", container, cfg.segments_container_suffix)),
            segment_size: cfg.segment_size_mb.saturating_mul(MIB),
            concurrency: cfg.concurrency,
            max_disk_space: cfg
                .max_disk_space_mb
                .filter(|mb| *mb > 0)
                .map(|mb| mb.saturating_mul(MIB)),
            temp_dir: cfg.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            limits: PlanLimits {
                max_segments: cfg.max_segments,
                ..PlanLimits::default()
            },
        }
    }

    /// Reject settings that can never produce a valid upload.
    pub fn validate(&self) -> Result<(), UploadError> {
        validate_container(&self.container)?;
        if let Some(segments) = &self.segments_container {
            validate_container(segments)?;
        }
        if let Some(name) = &self.object_name {
            if name.is_empty() || name.starts_with('/') {
                return Err(UploadError::InvalidInput(format!(
                    "invalid object name {:?}",
                    name
                )));
            }
        }
        if self.concurrency == 0 {
            return Err(UploadError::InvalidInput(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_object_name(&self, source: &Path) -> Result<String, UploadError> {
        if let Some(name) = &self.object_name {
            return Ok(name.clone());
        }
        source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UploadError::InvalidInput(format!(
                    "cannot derive an object name from {}",
                    source.display()
                ))
            })
    }

    fn resolve_segments_container(&self) -> String {
        self.segments_container
            .clone()
            .unwrap_or_else(|| format!("{}_segments", self.container))
    }
}

fn validate_container(name: &str) -> Result<(), UploadError> {
    if name.is_empty() || name.contains('/') || name.len() > 256 {
        return Err(UploadError::InvalidInput(format!(
            "invalid container name {:?}",
            name
        )));
    }
    Ok(())
}

/// What an upload run ended with.
#[derive(Debug)]
pub enum UploadOutcome {
    /// Manifest stored; holds `<container>/<object_name>`.
    Success(String),
    /// Listed segments failed; no manifest was written.
    SegmentFailure(Vec<usize>),
    /// All segments are stored but the manifest PUT failed.
    ManifestFailure(UploadError),
    /// Bad options or an unusable source file; nothing was uploaded.
    PlanningError(UploadError),
    /// Container or temp directory setup failed, or an internal invariant broke.
    /// For setup failures no segment data was uploaded.
    SetupFailure(UploadError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }

    /// Classify the result of `UploadCoordinator::run`.
    pub fn from_run(result: Result<String, UploadError>) -> Self {
        match result {
            Ok(path) => UploadOutcome::Success(path),
            Err(UploadError::UploadFailed { failed }) => UploadOutcome::SegmentFailure(failed),
            Err(e @ UploadError::ManifestUploadFailed(_)) => UploadOutcome::ManifestFailure(e),
            Err(e) => UploadOutcome::SetupFailure(e),
        }
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Success(path) => write!(f, "uploaded {}", path),
            UploadOutcome::SegmentFailure(failed) => {
                let list: Vec<String> = failed.iter().map(|i| i.to_string()).collect();
                write!(f, "segment(s) failed: {}", list.join(", "))
            }
            UploadOutcome::ManifestFailure(e) => {
                write!(f, "{} (segments are stored; only the manifest needs retrying)", e)
            }
            UploadOutcome::PlanningError(e) => write!(f, "{}", e),
            UploadOutcome::SetupFailure(
                e @ (UploadError::Container { .. } | UploadError::TempDir { .. }),
            ) => write!(f, "{} (no segment data was uploaded)", e),
            UploadOutcome::SetupFailure(e) => write!(f, "{}", e),
        }
    }
}

/// Validate options, open the source and plan the upload. No remote I/O.
pub fn prepare_upload(
    source_path: &Path,
    options: &UploadOptions,
    store: Arc<dyn ObjectStore>,
) -> Result<UploadCoordinator, UploadError> {
    options.validate()?;
    let object_name = options.resolve_object_name(source_path)?;
    let segments_container = options.resolve_segments_container();

    let source = SourceFile::open(source_path).map_err(|source| UploadError::Source {
        path: source_path.to_path_buf(),
        source,
    })?;

    let plan = plan_upload(
        source.len(),
        options.segment_size,
        &options.limits,
        &options.container,
        &segments_container,
        &object_name,
    )?;
    let budget = DiskBudget::derive(
        options.concurrency,
        options.max_disk_space,
        plan.segment_size,
        plan.segment_count,
    );

    Ok(UploadCoordinator::new(plan, source, store, &options.temp_dir, budget))
}

/// Upload `source_path` as a Static Large Object.
///
/// Blocks until every segment and the manifest are stored or the run fails.
/// Call from `spawn_blocking` when used from async code.
pub fn upload(
    source_path: &Path,
    options: &UploadOptions,
    store: Arc<dyn ObjectStore>,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressStats>>,
) -> UploadOutcome {
    let coordinator = match prepare_upload(source_path, options, store) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(source = %source_path.display(), "upload not started: {}", e);
            return UploadOutcome::PlanningError(e);
        }
    };
    let coordinator = match progress_tx {
        Some(tx) => coordinator.with_progress(tx),
        None => coordinator,
    };
    UploadOutcome::from_run(coordinator.run())
}
