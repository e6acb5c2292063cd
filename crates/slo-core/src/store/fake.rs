//! In-memory object store for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ObjectStore, PutResponse, StoreError};
use crate::manifest::ManifestEntry;

type Manifest = (String, String, Vec<ManifestEntry>);

#[derive(Default)]
pub(crate) struct FakeStore {
    containers: Mutex<HashSet<String>>,
    container_creates: AtomicUsize,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    manifests: Mutex<Vec<Manifest>>,
    puts: AtomicUsize,
    max_local_files: AtomicUsize,
    fail_indices: HashSet<usize>,
    fail_manifest: bool,
    delay: Option<fn(usize) -> Duration>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the PUT of any segment whose index is in `indices`.
    pub(crate) fn failing_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.fail_indices.extend(indices);
        self
    }

    pub(crate) fn failing_manifest(mut self) -> Self {
        self.fail_manifest = true;
        self
    }

    /// Sleep for `delay(index)` inside each segment PUT.
    pub(crate) fn with_delay(mut self, delay: fn(usize) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn object(&self, container: &str, object: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), object.to_string()))
            .cloned()
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn container_creates(&self) -> usize {
        self.container_creates.load(Ordering::SeqCst)
    }

    pub(crate) fn manifests(&self) -> Vec<Manifest> {
        self.manifests.lock().unwrap().clone()
    }

    /// Most segment files seen next to an uploaded segment at once.
    pub(crate) fn max_local_files(&self) -> usize {
        self.max_local_files.load(Ordering::SeqCst)
    }

    fn segment_index(object: &str) -> Option<usize> {
        object.rsplit('/').next()?.parse().ok()
    }
}

fn fake_etag(data: &[u8]) -> String {
    // FNV-1a; stable and good enough to tell segments apart.
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in data {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:016x}", h)
}

impl ObjectStore for FakeStore {
    fn create_container(&self, container: &str) -> Result<(), StoreError> {
        self.container_creates.fetch_add(1, Ordering::SeqCst);
        self.containers.lock().unwrap().insert(container.to_string());
        Ok(())
    }

    fn put_object(
        &self,
        container: &str,
        object: &str,
        source: &Path,
    ) -> Result<PutResponse, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if !self.containers.lock().unwrap().contains(container) {
            return Err(StoreError::Http {
                status: 404,
                body: format!("container {container} not found"),
            });
        }
        if let Some(dir) = source.parent() {
            let files = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
                .count();
            self.max_local_files.fetch_max(files, Ordering::SeqCst);
        }
        let index = Self::segment_index(object);
        if let (Some(delay), Some(i)) = (self.delay, index) {
            std::thread::sleep(delay(i));
        }
        if index.is_some_and(|i| self.fail_indices.contains(&i)) {
            return Err(StoreError::Http {
                status: 500,
                body: "injected failure".into(),
            });
        }
        let data = std::fs::read(source)?;
        let etag = fake_etag(&data);
        let size_bytes = data.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), object.to_string()), data);
        Ok(PutResponse { size_bytes, etag })
    }

    fn put_manifest(
        &self,
        container: &str,
        object: &str,
        entries: &[ManifestEntry],
    ) -> Result<(), StoreError> {
        if self.fail_manifest {
            return Err(StoreError::Http {
                status: 409,
                body: "Etag mismatch".into(),
            });
        }
        self.manifests.lock().unwrap().push((
            container.to_string(),
            object.to_string(),
            entries.to_vec(),
        ));
        Ok(())
    }
}
