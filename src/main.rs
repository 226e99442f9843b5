//! pledge-dl CLI -- wires configuration, logging and signal handling
//! around the library's orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pledge_dl::{
    ApiClient, Config, IgnoreRules, InFlightRegistry, Orchestrator, RunOutcome,
};

/// Environment variable naming the config file.
const CONFIG_ENV_VAR: &str = "PLEDGE_DL_CONFIG";

/// Exit status after an interrupt, once cleanup has run.
const INTERRUPT_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> pledge_dl::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut force = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--force" => force = true,
            other => warn!(argument = other, "ignoring unknown argument"),
        }
    }

    let config_path = std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("pledge-dl.toml"));
    let mut config = Config::load(&config_path)?;
    config.force = config.force || force;

    let rules = IgnoreRules::load(&config.rules_file);
    let registry = InFlightRegistry::new();
    let cancel = CancellationToken::new();

    let config = Arc::new(config);
    let source = Arc::new(ApiClient::new(&config)?);
    let orchestrator = Orchestrator::new(
        source,
        Arc::clone(&config),
        rules,
        registry.clone(),
        cancel.clone(),
    );

    match pledge_dl::run_with_cleanup(orchestrator, registry, cancel).await? {
        RunOutcome::Completed(summary) => {
            info!(
                artists_processed = summary.artists_processed,
                artists_skipped = summary.artists_skipped,
                files_downloaded = summary.files_downloaded,
                files_skipped = summary.files_skipped,
                files_failed = summary.files_failed,
                "all done"
            );
            Ok(())
        }
        RunOutcome::Interrupted { partials_removed } => {
            info!(partials_removed, "interrupted; exiting");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    }
}
