//! Shared read-only handle to the file being uploaded.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

const BUF_SIZE: usize = 64 * 1024;

/// Source file opened once and shared by all workers. Safe to clone; each
/// read is positional (pread-style) and does not move a shared cursor.
#[derive(Debug, Clone)]
pub struct SourceFile {
    file: Arc<File>,
    len: u64,
}

impl SourceFile {
    /// Open `path` for reading and record its current length.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }
        Ok(Self {
            file: Arc::new(file),
            len: meta.len(),
        })
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Copy `[offset, offset + length)` into a new file at `dest`, streaming
    /// through a fixed buffer. Fails if the source ends before `length` bytes.
    pub fn copy_range_to(&self, offset: u64, length: u64, dest: &Path) -> io::Result<u64> {
        let mut out = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(dest)?;
        let mut buf = vec![0u8; BUF_SIZE];
        let mut copied = 0u64;
        while copied < length {
            let want = (length - copied).min(BUF_SIZE as u64) as usize;
            let n = self.read_at(&mut buf[..want], offset + copied)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "source ended at {} bytes, expected range end {}",
                        offset + copied,
                        offset + length
                    ),
                ));
            }
            out.write_all(&buf[..n])?;
            copied += n as u64;
        }
        out.flush()?;
        Ok(copied)
    }

    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        loop {
            match self.file.read_at(buf, offset) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Non-Unix fallback: seek + read on a cloned handle. The clone shares the
    /// cursor, so concurrent readers are serialized through the lock below.
    #[cfg(not(unix))]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        static SEEK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        let _guard = SEEK_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.read(buf)
    }
}
