//! # pledge-dl
//!
//! Concurrent downloader for pledged subscription content.
//!
//! pledge-dl discovers the creators an account supports, filters them
//! through an ignore/allow rule file, and downloads every paid post the
//! account's pledge tier grants access to, organized on disk per
//! creator and post. The core is the download orchestration subsystem:
//! a bounded worker pool draining a per-artist job queue, interrupt-safe
//! tracking of in-flight partial writes, and deterministic output paths
//! that make re-runs idempotent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use pledge_dl::{
//!     ApiClient, Config, IgnoreRules, InFlightRegistry, Orchestrator, RunOutcome,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let rules = IgnoreRules::load(&config.rules_file);
//!     let registry = InFlightRegistry::new();
//!     let cancel = CancellationToken::new();
//!
//!     let source = Arc::new(ApiClient::new(&config)?);
//!     let orchestrator =
//!         Orchestrator::new(source, config, rules, registry.clone(), cancel.clone());
//!
//!     match pledge_dl::run_with_cleanup(orchestrator, registry, cancel).await? {
//!         RunOutcome::Completed(summary) => println!("done: {summary:?}"),
//!         RunOutcome::Interrupted { partials_removed } => {
//!             println!("interrupted, {partials_removed} partial files removed");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authenticated platform API client
pub mod client;
/// Configuration types
pub mod config;
/// Download dispatcher, worker pool and in-flight registry
pub mod downloader;
/// Error types
pub mod error;
/// Run orchestration
pub mod orchestrator;
/// Output path derivation
pub mod paths;
/// Artist ignore/allow rules
pub mod rules;
/// Core domain types
pub mod types;

// Re-export commonly used types
pub use client::{ApiClient, RemoteSource, SESSION_ENV_VAR};
pub use config::Config;
pub use downloader::{InFlightRegistry, PledgeDownloader, RunStats, WorkerId};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, RunOutcome, RunSummary};
pub use rules::IgnoreRules;
pub use types::{Artist, FileEntry, Post, PostDetail};

/// Run the orchestrator under signal supervision.
///
/// Races the run against a termination signal. When a signal arrives
/// first, the cancellation token stops workers from starting new writes,
/// every in-flight partial file is removed from disk, and the outcome is
/// [`RunOutcome::Interrupted`]. No truncated file is left looking like a
/// completed download.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a `ctrl_c` fallback
///   if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_cleanup(
    orchestrator: Orchestrator,
    registry: InFlightRegistry,
    cancel: tokio_util::sync::CancellationToken,
) -> Result<RunOutcome> {
    tokio::select! {
        result = orchestrator.run() => result.map(RunOutcome::Completed),
        _ = wait_for_signal() => {
            cancel.cancel();
            let removed = registry.cleanup_partials().await;
            tracing::info!(partials_removed = removed.len(), "interrupt cleanup complete");
            Ok(RunOutcome::Interrupted {
                partials_removed: removed.len(),
            })
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers,
    // tests); fall back to ctrl_c rather than giving up.
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("received SIGTERM");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("received SIGINT (Ctrl+C)");
        }
        (Err(e), _) => {
            tracing::error!(error = %e, "could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
