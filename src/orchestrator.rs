//! Run sequencing -- plan discovery, rule checks, per-artist dispatch.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;

use crate::client::RemoteSource;
use crate::config::Config;
use crate::downloader::{InFlightRegistry, PledgeDownloader};
use crate::error::Result;
use crate::rules::IgnoreRules;
use crate::types::Artist;

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Artists whose posts were dispatched
    pub artists_processed: usize,
    /// Artists skipped by the ignore rules
    pub artists_skipped: usize,
    /// Files written to disk
    pub files_downloaded: u64,
    /// Files skipped because they already existed
    pub files_skipped: u64,
    /// Post-detail fetches or file downloads that failed
    pub files_failed: u64,
}

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The orchestrator ran to completion.
    Completed(RunSummary),
    /// A termination signal arrived; partial files were cleaned up.
    Interrupted {
        /// Number of partial files removed from disk
        partials_removed: usize,
    },
}

/// Sequences one full run: discovery, rule checks, dispatch, summary.
///
/// Artists are processed strictly sequentially; all concurrency lives
/// inside the per-artist worker pool.
pub struct Orchestrator {
    source: Arc<dyn RemoteSource>,
    config: Arc<Config>,
    rules: IgnoreRules,
    dispatcher: PledgeDownloader,
}

impl Orchestrator {
    /// Build an orchestrator. The registry and cancellation token are
    /// shared with the caller's termination path.
    pub fn new(
        source: Arc<dyn RemoteSource>,
        config: Arc<Config>,
        rules: IgnoreRules,
        registry: InFlightRegistry,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = PledgeDownloader::new(
            Arc::clone(&source),
            Arc::clone(&config),
            registry,
            cancel,
        );
        Self {
            source,
            config,
            rules,
            dispatcher,
        }
    }

    /// Run to completion: fetch the supported plans, then dispatch every
    /// artist the rules allow, pacing between artists.
    pub async fn run(&self) -> Result<RunSummary> {
        let plans = self.source.supporting_plans().await?;
        let artists: Vec<Artist> = plans.into_iter().map(Artist::from_plan).collect();
        let total_fee: u64 = artists.iter().map(|artist| u64::from(artist.fee)).sum();
        tracing::info!(
            artists = artists.len(),
            total_fee,
            "discovered supported plans"
        );

        let mut summary = RunSummary::default();
        for artist in &artists {
            if self.rules.should_skip(artist) {
                tracing::info!(
                    artist = %artist.name,
                    creator_id = %artist.creator_id,
                    "skipped by ignore rules"
                );
                summary.artists_skipped += 1;
                continue;
            }

            if summary.artists_processed > 0 {
                tokio::time::sleep(self.config.request_delay()).await;
            }
            tracing::info!(artist = %artist.name, fee = artist.fee, "processing artist");
            self.dispatcher.drain_artist(artist).await?;
            summary.artists_processed += 1;
        }

        let stats = self.dispatcher.stats();
        summary.files_downloaded = stats.downloaded.load(Ordering::Relaxed);
        summary.files_skipped = stats.skipped.load(Ordering::Relaxed);
        summary.files_failed = stats.failed.load(Ordering::Relaxed);
        tracing::info!(
            artists_processed = summary.artists_processed,
            artists_skipped = summary.artists_skipped,
            files_downloaded = summary.files_downloaded,
            files_skipped = summary.files_skipped,
            files_failed = summary.files_failed,
            "run complete"
        );
        Ok(summary)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::ApiClient;

    fn test_orchestrator(server: &MockServer, out_dir: &std::path::Path, rules: IgnoreRules) -> Orchestrator {
        let config = Arc::new(Config {
            api_base: server.uri(),
            out_dir: out_dir.to_path_buf(),
            request_delay_ms: 0,
            session_file: out_dir.join(".session"),
            ..Config::default()
        });
        let source = Arc::new(ApiClient::new(&config).unwrap());
        Orchestrator::new(
            source,
            config,
            rules,
            InFlightRegistry::new(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    #[serial]
    async fn skipped_artists_are_never_listed() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/plans/supporting"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": [
                    {"user": {"name": "keep-me", "userId": 1},
                     "title": "plan a", "fee": 500, "creatorId": "keep-ch"},
                    {"user": {"name": "skip-me", "userId": 2},
                     "title": "plan b", "fee": 300, "creatorId": "skip-ch"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("creator", "keep-ch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": {"items": [], "nextUrl": null}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("creator", "skip-ch"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let rules = IgnoreRules::new(vec![], vec!["skip-me".into()]);
        let orchestrator = test_orchestrator(&server, dir.path(), rules);
        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.artists_processed, 1);
        assert_eq!(summary.artists_skipped, 1);
        assert_eq!(summary.files_downloaded, 0);
    }

    #[tokio::test]
    #[serial]
    async fn empty_plan_list_completes_with_empty_summary() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/plans/supporting"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"body": []})),
            )
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server, dir.path(), IgnoreRules::default());
        let summary = orchestrator.run().await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    #[serial]
    async fn plan_discovery_failure_aborts_the_run() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/plans/supporting"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let orchestrator = test_orchestrator(&server, dir.path(), IgnoreRules::default());
        assert!(orchestrator.run().await.is_err());
    }
}
