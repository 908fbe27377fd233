//! Temporary artifact management for screenshot capture
//!
//! Capture commands write into a dedicated subdirectory of the system temp
//! directory. Each invocation owns its artifacts exclusively: the manager
//! hands out [`TempArtifact`] guards that delete the underlying file when
//! dropped, so every exit path (success, capture failure, resize failure)
//! leaves no files behind. The manager additionally tracks every allocated
//! path and sweeps leftovers when the last reference is dropped.
//!
//! Filenames combine a millisecond timestamp with a process-wide monotonic
//! counter, so two captures allocated in the same millisecond cannot
//! collide.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;

use crate::error::{CaptureError, CaptureResult};

/// Process-wide sequence number appended to every artifact filename
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Thread-safe temporary artifact manager
///
/// Allocates unique paths under `$TMPDIR/screengrab-mcp/` and tracks them
/// until they are discarded. Cloning shares the tracking list; the
/// tracked files are swept when the last clone is dropped. Sweeping is
/// best-effort and never panics.
#[derive(Clone, Debug)]
pub struct TempFileManager {
    files: Arc<Mutex<Vec<PathBuf>>>,
}

impl TempFileManager {
    /// Creates a new empty manager
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Base directory for capture artifacts
    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join("screengrab-mcp")
    }

    fn ensure_temp_dir() -> CaptureResult<PathBuf> {
        let dir = Self::temp_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(CaptureError::IoError)?;
        }
        Ok(dir)
    }

    /// Allocates a unique artifact path and returns its cleanup guard
    ///
    /// The filename is `{prefix}-{timestamp}-{seq}.{ext}`. The file itself
    /// is not created; the capture command owns producing it. The parent
    /// directory is created if missing.
    pub fn allocate(&self, prefix: &str, ext: &str) -> CaptureResult<TempArtifact> {
        let dir = Self::ensure_temp_dir()?;

        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{}-{}-{}.{}", prefix, timestamp, seq, ext));

        if let Ok(mut files) = self.files.lock() {
            files.push(path.clone());
        }

        Ok(TempArtifact {
            files: Arc::downgrade(&self.files),
            path,
        })
    }

    /// Removes every tracked file and clears the tracking list
    pub fn cleanup_all(&self) {
        if let Ok(mut files) = self.files.lock() {
            for path in files.iter() {
                if path.exists() {
                    if let Err(e) = fs::remove_file(path) {
                        tracing::warn!("failed to remove temp file {:?}: {}", path, e);
                    }
                }
            }
            files.clear();
        }
    }

    /// Number of currently tracked artifacts
    pub fn count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

impl Default for TempFileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        // Sweep only when the last clone goes away.
        if Arc::strong_count(&self.files) == 1 {
            self.cleanup_all();
        }
    }
}

/// Cleanup guard for one capture artifact
///
/// Deletes the file (if it exists) and untracks the path when dropped.
/// Artifacts are intentionally not defusable: the pipeline's contract is
/// that no temp file survives a capture call on any path. The guard holds
/// only a weak reference to the manager, so leaked guards never keep the
/// manager's final sweep from running.
#[derive(Debug)]
pub struct TempArtifact {
    files: Weak<Mutex<Vec<PathBuf>>>,
    path: PathBuf,
}

impl TempArtifact {
    /// Path the capture or resize step should write to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("failed to remove temp file {:?}: {}", self.path, e);
            }
        }
        if let Some(files) = self.files.upgrade() {
            if let Ok(mut files) = files.lock() {
                files.retain(|p| *p != self.path);
            }
        }
    }
}
