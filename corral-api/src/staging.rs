//! Chunk staging and final assembly
//!
//! Each in-flight upload owns one staging directory named after its upload id
//! (a server-generated UUID), with one `<index>.part` file per chunk. Writing
//! the same index twice replaces its bytes, never duplicates them.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem home for in-flight chunk data.
#[derive(Debug, Clone)]
pub struct ChunkStaging {
    root: PathBuf,
}

impl ChunkStaging {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn session_dir(&self, upload_id: &str) -> PathBuf {
        self.root.join(upload_id)
    }

    /// Deterministic path for one chunk: `<root>/<upload_id>/<index>.part`
    pub fn chunk_path(&self, upload_id: &str, index: i64) -> PathBuf {
        self.session_dir(upload_id).join(format!("{}.part", index))
    }

    /// Persist one chunk's bytes. Overwrite is idempotent.
    pub async fn write_chunk(&self, upload_id: &str, index: i64, data: &[u8]) -> io::Result<()> {
        let dir = self.session_dir(upload_id);
        fs::create_dir_all(&dir).await?;
        fs::write(self.chunk_path(upload_id, index), data).await
    }

    /// Concatenate staged chunks in the given index order into `dest`.
    ///
    /// The caller supplies the indices sorted ascending; byte-exact
    /// reconstruction holds when indices 0..N-1 were each uploaded.
    /// Returns total bytes written.
    pub async fn assemble(&self, upload_id: &str, indices: &[i64], dest: &Path) -> io::Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut out = fs::File::create(dest).await?;
        let mut total: u64 = 0;
        for &index in indices {
            let bytes = fs::read(self.chunk_path(upload_id, index)).await?;
            out.write_all(&bytes).await?;
            total += bytes.len() as u64;
        }
        out.flush().await?;
        Ok(total)
    }

    /// Delete all staged bytes for an upload. Missing directory is a no-op,
    /// so cancel-then-cancel and complete-then-cleanup stay idempotent.
    pub async fn remove(&self, upload_id: &str) -> io::Result<()> {
        match fs::remove_dir_all(self.session_dir(upload_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Reduce a caller-supplied filename to its final path component.
///
/// Final artifacts land under the served files directory; a name like
/// `../../etc/passwd` must not escape it.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string();
    if base.is_empty() || base == "." || base == ".." {
        "upload.bin".to_string()
    } else {
        base
    }
}
