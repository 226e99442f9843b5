//! Worker loop -- drains the shared job queue and downloads each post's files.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::RemoteSource;
use crate::config::Config;
use crate::paths;
use crate::types::{Artist, FileEntry, Post, PostDetail};

use super::RunStats;
use super::registry::InFlightRegistry;

/// Everything one worker task needs, cloned per worker.
pub(super) struct WorkerContext {
    pub(super) worker_id: usize,
    pub(super) queue: Arc<Mutex<VecDeque<Post>>>,
    pub(super) artist: Arc<Artist>,
    pub(super) source: Arc<dyn RemoteSource>,
    pub(super) config: Arc<Config>,
    pub(super) registry: InFlightRegistry,
    pub(super) cancel: CancellationToken,
    pub(super) stats: Arc<RunStats>,
}

/// Worker loop: non-blocking dequeue, terminate on empty queue.
pub(super) async fn run(ctx: WorkerContext) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let job = { ctx.queue.lock().await.pop_front() };
        let Some(post) = job else { break };
        process_post(&ctx, post).await;
    }
    tracing::debug!(worker = ctx.worker_id, "worker finished");
}

/// Process one job: fetch the post detail and download its files in
/// source order. A failed detail fetch abandons only this job.
async fn process_post(ctx: &WorkerContext, post: Post) {
    let detail = match ctx.source.post_detail(&post.id).await {
        Ok(record) => PostDetail::from_api(record),
        Err(e) => {
            tracing::error!(
                worker = ctx.worker_id,
                post_id = %post.id,
                error = %e,
                "failed to fetch post detail"
            );
            ctx.stats.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    tracing::info!(
        worker = ctx.worker_id,
        post_id = %detail.id,
        title = %detail.title,
        files = detail.files.len(),
        "processing post"
    );

    for file in &detail.files {
        if ctx.cancel.is_cancelled() {
            return;
        }
        download_file(ctx, &detail, file).await;
    }
}

/// Download one file unless it already exists. Failures are isolated:
/// they are counted and logged but never abort sibling files.
async fn download_file(ctx: &WorkerContext, post: &PostDetail, file: &FileEntry) {
    let dest = paths::file_path(&ctx.config.out_dir, &ctx.artist, post, file);

    if dest.exists() && !ctx.config.force {
        tracing::debug!(path = %dest.display(), "already downloaded, skipping");
        ctx.stats.skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            tracing::error!(
                worker = ctx.worker_id,
                path = %dest.display(),
                error = %e,
                "failed to create parent directory"
            );
            ctx.stats.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    ctx.registry.begin(ctx.worker_id, &dest).await;
    let result = ctx.source.download_to(&file.url, &dest).await;
    ctx.registry.finish(ctx.worker_id).await;

    match result {
        Ok(()) => {
            tracing::info!(worker = ctx.worker_id, path = %dest.display(), "downloaded");
            ctx.stats.downloaded.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::error!(
                worker = ctx.worker_id,
                url = %file.url,
                path = %dest.display(),
                error = %e,
                "download failed"
            );
            ctx.stats.failed.fetch_add(1, Ordering::Relaxed);
            // a truncated destination must not pass the exists() check on
            // the next run
            if dest.exists() {
                if let Err(e) = std::fs::remove_file(&dest) {
                    tracing::warn!(path = %dest.display(), error = %e, "failed to remove truncated file");
                }
            }
        }
    }
}
