//! Authenticated platform API client
//!
//! [`ApiClient`] is the production [`RemoteSource`]: it attaches a fixed
//! authentication header set to every request, decodes JSON endpoint
//! responses, walks the paginated post listing with the configured pacing
//! delay, and streams file bodies straight to disk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{ApiEnvelope, PlanRecord, Post, PostDetailRecord, PostPage};

/// Environment variable holding the session credential. Overrides the
/// session file when set and non-empty.
pub const SESSION_ENV_VAR: &str = "PLEDGE_DL_SESSION";

/// Cookie name carrying the session credential.
const SESSION_COOKIE: &str = "session_id";

/// Per-request timeout to prevent hanging on a stalled transfer.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Remote operations the dispatcher and orchestrator depend on.
///
/// Abstracting the transport keeps the download pipeline testable without
/// a network; [`ApiClient`] is the production implementation.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// All supported-plan records for the authenticated account.
    async fn supporting_plans(&self) -> Result<Vec<PlanRecord>>;

    /// All post summaries for one creator, across every listing page.
    async fn list_posts(&self, creator_id: &str) -> Result<Vec<Post>>;

    /// Full detail record for one post.
    async fn post_detail(&self, post_id: &str) -> Result<PostDetailRecord>;

    /// Stream the resource at `url` into the file at `dest`.
    async fn download_to(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Production [`RemoteSource`] backed by reqwest.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: Url,
    page_delay: Duration,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// The credential chain is: `PLEDGE_DL_SESSION` environment variable,
    /// else the configured session file, else unauthenticated with a
    /// warning, never a hard failure.
    pub fn new(config: &Config) -> Result<Self> {
        let mut api_base = Url::parse(&config.api_base).map_err(|e| Error::Config {
            message: format!("invalid api_base '{}': {}", config.api_base, e),
            key: Some("api_base".into()),
        })?;
        // Url::join treats a base without a trailing slash as a file path
        // and would drop its last segment.
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .default_headers(auth_headers(config, &api_base))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_base,
            page_delay: config.request_delay(),
        })
    }

    fn endpoint(&self, path_and_query: &str) -> Result<Url> {
        self.api_base
            .join(path_and_query)
            .map_err(|e| Error::InvalidUrl {
                url: format!("{}{}", self.api_base, path_and_query),
                message: e.to_string(),
            })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let text = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.body)
    }
}

#[async_trait]
impl RemoteSource for ApiClient {
    async fn supporting_plans(&self) -> Result<Vec<PlanRecord>> {
        let url = self.endpoint("plans/supporting")?;
        self.get_json(url).await
    }

    async fn list_posts(&self, creator_id: &str) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut next = Some(self.endpoint(&format!("posts?creator={creator_id}"))?);
        let mut first_page = true;

        while let Some(url) = next.take() {
            if !first_page {
                tokio::time::sleep(self.page_delay).await;
            }
            first_page = false;

            let page: PostPage = self.get_json(url).await?;
            tracing::debug!(creator_id, page_items = page.items.len(), "fetched listing page");
            posts.extend(page.items);

            next = match page.next_url {
                Some(raw) => Some(Url::parse(&raw).map_err(|e| Error::InvalidUrl {
                    url: raw,
                    message: e.to_string(),
                })?),
                None => None,
            };
        }
        Ok(posts)
    }

    async fn post_detail(&self, post_id: &str) -> Result<PostDetailRecord> {
        let url = self.endpoint(&format!("posts/{post_id}"))?;
        self.get_json(url).await
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<()> {
        let target = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let response = self.http.get(target).send().await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Fixed header set attached to every request.
fn auth_headers(config: &Config, api_base: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&config.user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&api_base.origin().ascii_serialization()) {
        headers.insert(ORIGIN, value);
    }

    match resolve_session(config) {
        Some(session) => {
            if let Ok(mut value) = HeaderValue::from_str(&format!("{SESSION_COOKIE}={session}")) {
                value.set_sensitive(true);
                headers.insert(COOKIE, value);
            }
        }
        None => {
            tracing::warn!(
                session_file = %config.session_file.display(),
                "no session credential found; requests will be unauthenticated"
            );
        }
    }

    headers
}

/// Resolve the session credential: environment variable first, then the
/// session file. Absence of both is `None`, not an error.
fn resolve_session(config: &Config) -> Option<String> {
    if let Ok(value) = std::env::var(SESSION_ENV_VAR) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    match std::fs::read_to_string(&config.session_file) {
        Ok(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Err(_) => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base: &str, dir: &Path) -> Config {
        Config {
            api_base: api_base.to_string(),
            session_file: dir.join(".session"),
            request_delay_ms: 0,
            ..Config::default()
        }
    }

    // --- credential resolution ---

    #[test]
    #[serial]
    fn env_credential_overrides_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("https://api.example.com", dir.path());
        std::fs::write(&config.session_file, "from-file\n").unwrap();

        unsafe { std::env::set_var(SESSION_ENV_VAR, "from-env") };
        let resolved = resolve_session(&config);
        unsafe { std::env::remove_var(SESSION_ENV_VAR) };

        assert_eq!(resolved.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn file_credential_used_when_env_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("https://api.example.com", dir.path());
        std::fs::write(&config.session_file, "  from-file\n").unwrap();

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        assert_eq!(resolve_session(&config).as_deref(), Some("from-file"));
    }

    #[test]
    #[serial]
    fn missing_credential_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("https://api.example.com", dir.path());

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        assert_eq!(resolve_session(&config), None);
    }

    // --- request behavior ---

    #[tokio::test]
    #[serial]
    async fn session_cookie_attached_to_requests() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());
        std::fs::write(&config.session_file, "secret-token").unwrap();

        Mock::given(method("GET"))
            .and(path("/plans/supporting"))
            .and(header("cookie", "session_id=secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        let client = ApiClient::new(&config).unwrap();
        let plans = client.supporting_plans().await.unwrap();
        assert!(plans.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn list_posts_follows_pagination() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());

        let second_page = format!("{}/posts?creator=c1&page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("creator", "c1"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": {
                    "items": [{"id": "p2", "title": "two", "feeRequired": 300}],
                    "nextUrl": null
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("creator", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": {
                    "items": [{"id": "p1", "title": "one", "feeRequired": 300}],
                    "nextUrl": second_page
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        let client = ApiClient::new(&config).unwrap();
        let posts = client.list_posts("c1").await.unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2"]);
    }

    #[tokio::test]
    #[serial]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());

        Mock::given(method("GET"))
            .and(path("/posts/p404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        let client = ApiClient::new(&config).unwrap();
        match client.post_detail("p404").await {
            Err(Error::Api { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn download_to_streams_body_to_disk() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.uri(), dir.path());

        Mock::given(method("GET"))
            .and(path("/files/cover.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        unsafe { std::env::remove_var(SESSION_ENV_VAR) };
        let client = ApiClient::new(&config).unwrap();
        let dest = dir.path().join("cover.png");
        client
            .download_to(&format!("{}/files/cover.png", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"png-bytes");
    }

    #[test]
    fn invalid_api_base_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("not a url", dir.path());
        match ApiClient::new(&config) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("api_base")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }
}
