//! In-flight download tracking for interrupt cleanup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

/// Identity of one worker task within a dispatch pool.
pub type WorkerId = usize;

/// Concurrency-safe map from worker to the destination path it is
/// currently writing.
///
/// The registry is an explicitly owned value cloned into the dispatcher
/// and the termination path; both sides share one map for the lifetime of
/// the process. An entry exists only while its worker is between
/// [`begin`](Self::begin) and [`finish`](Self::finish), so everything in
/// the map at interrupt time is a partial download.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashMap<WorkerId, PathBuf>>>,
}

impl InFlightRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `worker` is about to start writing `path`.
    pub async fn begin(&self, worker: WorkerId, path: &Path) {
        self.inner.lock().await.insert(worker, path.to_path_buf());
    }

    /// Clear `worker`'s entry. Called when the write ends, on both success
    /// and failure.
    pub async fn finish(&self, worker: WorkerId) {
        self.inner.lock().await.remove(&worker);
    }

    /// Number of writes currently in flight.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no writes are in flight.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Delete every registered path that still exists on disk and clear
    /// the registry. Returns the paths that were removed.
    ///
    /// Best-effort compensating action: the owning worker may complete and
    /// finalize its file between the existence check and the delete
    /// (harmless deletion of a completed file), or may still be writing
    /// while its file is deleted (accepted partial-download loss on
    /// interrupt). Neither race is an error.
    pub async fn cleanup_partials(&self) -> Vec<PathBuf> {
        let mut inner = self.inner.lock().await;
        let mut removed = Vec::with_capacity(inner.len());
        for (worker, path) in inner.drain() {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(worker, path = %path.display(), "removed partial download");
                    removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(
                        worker,
                        path = %path.display(),
                        error = %e,
                        "failed to remove partial download"
                    );
                }
            }
        }
        removed
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_and_finish_track_one_entry_per_worker() {
        let registry = InFlightRegistry::new();
        assert!(registry.is_empty().await);

        registry.begin(0, Path::new("/tmp/a")).await;
        registry.begin(1, Path::new("/tmp/b")).await;
        assert_eq!(registry.len().await, 2);

        // a worker starting its next file replaces its previous entry
        registry.begin(0, Path::new("/tmp/c")).await;
        assert_eq!(registry.len().await, 2);

        registry.finish(0).await;
        registry.finish(1).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn cleanup_removes_partial_file_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("01-cover.png");
        std::fs::write(&partial, b"trunc").unwrap();

        let registry = InFlightRegistry::new();
        registry.begin(3, &partial).await;

        let removed = registry.cleanup_partials().await;
        assert_eq!(removed, vec![partial.clone()]);
        assert!(!partial.exists(), "partial file must be deleted");
        assert!(
            registry.is_empty().await,
            "no entry may survive pointing at a deleted path"
        );
    }

    #[tokio::test]
    async fn cleanup_tolerates_already_finalized_paths() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("already-finalized.png");

        let registry = InFlightRegistry::new();
        registry.begin(0, &gone).await;

        // worker completed and the path no longer exists: not an error
        let removed = registry.cleanup_partials().await;
        assert!(removed.is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn registry_clones_share_state() {
        let registry = InFlightRegistry::new();
        let other = registry.clone();

        registry.begin(5, Path::new("/tmp/x")).await;
        assert_eq!(other.len().await, 1, "clones must observe the same map");
    }
}
