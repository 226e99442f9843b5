//! Configuration types for pledge-dl

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Main configuration for a pledge-dl run
///
/// Every field has a default, so an absent or empty config file yields a
/// usable configuration. Loaded from TOML by [`Config::load`].
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Root URL of the platform API. The default is a placeholder; point
    /// this at your platform's API root.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Output directory for downloaded files (default: "out")
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Number of worker tasks draining the per-artist job queue (default: 5)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Fixed pacing delay between page-listing requests and between
    /// artists, in milliseconds (default: 1000)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// File holding the session credential; overridden by the
    /// `PLEDGE_DL_SESSION` environment variable (default: ".session")
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Artist ignore/allow rule file (default: "ignore.txt")
    #[serde(default = "default_rules_file")]
    pub rules_file: PathBuf,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Re-download files that already exist on disk. Usually set from the
    /// `--force` command-line flag rather than the config file.
    #[serde(default)]
    pub force: bool,
}

fn default_api_base() -> String {
    "https://api.example.com".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_worker_count() -> usize {
    5
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".session")
}

fn default_rules_file() -> PathBuf {
    PathBuf::from("ignore.txt")
}

fn default_user_agent() -> String {
    format!("pledge-dl/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            out_dir: default_out_dir(),
            worker_count: default_worker_count(),
            request_delay_ms: default_request_delay_ms(),
            session_file: default_session_file(),
            rules_file: default_rules_file(),
            user_agent: default_user_agent(),
            force: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: it yields [`Config::default`].
    /// A present but malformed file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config: Self = toml::from_str(&text).map_err(|e| Error::Config {
            message: format!("failed to parse '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::Config {
                message: "worker_count must be at least 1".into(),
                key: Some("worker_count".into()),
            });
        }
        Ok(())
    }

    /// The pacing delay as a [`Duration`].
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
