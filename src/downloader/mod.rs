//! Bounded worker-pool download dispatcher.
//!
//! One artist at a time: the accessible posts are enumerated up front and
//! seeded into a shared FIFO queue, then a fixed pool of worker tasks
//! drains it. Submodules:
//! - [`registry`] - in-flight write tracking for interrupt cleanup
//! - [`worker`] - the per-worker drain loop
mod registry;
mod worker;


pub use registry::{InFlightRegistry, WorkerId};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::client::RemoteSource;
use crate::config::Config;
use crate::error::Result;
use crate::types::{Artist, Post};

/// Shared per-run file counters, incremented by workers.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Files written to disk
    pub downloaded: AtomicU64,
    /// Files skipped because the destination already existed
    pub skipped: AtomicU64,
    /// Post-detail fetches or file downloads that failed
    pub failed: AtomicU64,
}

/// Dispatches the bounded worker pool, one artist at a time.
///
/// Cloneable: all fields are shared handles. The registry and cancellation
/// token are injected so the termination path observes the same state.
#[derive(Clone)]
pub struct PledgeDownloader {
    source: Arc<dyn RemoteSource>,
    config: Arc<Config>,
    registry: InFlightRegistry,
    cancel: CancellationToken,
    stats: Arc<RunStats>,
}

impl PledgeDownloader {
    /// Create a dispatcher over the given source and shared state.
    pub fn new(
        source: Arc<dyn RemoteSource>,
        config: Arc<Config>,
        registry: InFlightRegistry,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            config,
            registry,
            cancel,
            stats: Arc::new(RunStats::default()),
        }
    }

    /// The run's shared file counters.
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Enumerate, filter and download everything for one approved artist.
    ///
    /// Seeds the job queue with every accessible post summary, spawns the
    /// worker pool and fully drains it before returning; artists are
    /// strictly sequential. Listing failures propagate; download failures
    /// inside workers are isolated and counted instead.
    pub async fn drain_artist(&self, artist: &Artist) -> Result<()> {
        let posts = self.source.list_posts(&artist.creator_id).await?;
        let accessible: VecDeque<Post> = posts
            .into_iter()
            .filter(|post| post.is_accessible(artist))
            .collect();

        tracing::info!(
            artist = %artist.name,
            jobs = accessible.len(),
            workers = self.config.worker_count,
            "seeding job queue"
        );
        if accessible.is_empty() {
            return Ok(());
        }

        let queue = Arc::new(tokio::sync::Mutex::new(accessible));
        let artist = Arc::new(artist.clone());

        let mut handles = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            let ctx = worker::WorkerContext {
                worker_id,
                queue: Arc::clone(&queue),
                artist: Arc::clone(&artist),
                source: Arc::clone(&self.source),
                config: Arc::clone(&self.config),
                registry: self.registry.clone(),
                cancel: self.cancel.clone(),
                stats: Arc::clone(&self.stats),
            };
            handles.push(tokio::spawn(worker::run(ctx)));
        }
        join_all(handles).await;
        Ok(())
    }
}
