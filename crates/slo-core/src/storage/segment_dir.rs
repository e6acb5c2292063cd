//! Run directory for local segment files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory that holds segment files for one upload run. Always a child of
/// the configured temp dir, so removing it never touches user directories.
#[derive(Debug, Clone)]
pub struct SegmentDir {
    path: PathBuf,
}

impl SegmentDir {
    /// Name of the run directory under `temp_dir` for this process.
    pub fn run_path(temp_dir: &Path) -> PathBuf {
        temp_dir.join(format!("slo-upload-{}", std::process::id()))
    }

    /// Create (or reuse) the run directory under `temp_dir`.
    pub fn create(temp_dir: &Path) -> io::Result<Self> {
        let path = Self::run_path(temp_dir);
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deterministic local path for segment `index`.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("segment-{:08}.part", index))
    }

    /// Best-effort delete of a segment file. A missing file counts as deleted.
    pub fn delete_segment(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Number of segment files currently present.
    pub fn segment_files(&self) -> io::Result<usize> {
        let mut n = 0;
        for entry in fs::read_dir(&self.path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("segment-") && name.ends_with(".part") {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Remove the run directory and anything left in it.
    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.path)
    }
}
