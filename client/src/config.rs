//! Client configuration.

use eyre::{Context, ensure};
use reqwest::Url;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://ws.api.video";

/// Sandbox endpoint, for testing against throwaway data.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.api.video";

/// Largest body sent in one upload request. Sources up to this size go up in a single request.
pub const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

const ENV_BASE_URL: &str = "VIDHOST_BASE_URL";
const ENV_CHUNK_SIZE: &str = "VIDHOST_CHUNK_SIZE";

/// Settings shared by every request a [`crate::VideoClient`] makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Where the API lives; request paths are appended to it.
    pub base_url: Url,
    /// Maximum number of source bytes per upload request.
    pub chunk_size: u64,
    /// Sent as the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL always parses"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the sandbox environment.
    pub fn sandbox() -> Self {
        Self {
            base_url: Url::parse(SANDBOX_BASE_URL).expect("sandbox base URL always parses"),
            ..Self::default()
        }
    }

    /// Reads overrides from `VIDHOST_BASE_URL` and `VIDHOST_CHUNK_SIZE`.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], but with a caller-supplied variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            let base_url = Url::parse(&base_url)
                .with_context(|| format!("parse {ENV_BASE_URL} '{base_url}' as a URL"))?;
            config = config.with_base_url(base_url);
        }

        if let Some(chunk_size) = lookup(ENV_CHUNK_SIZE) {
            let chunk_size: u64 = chunk_size
                .trim()
                .parse()
                .with_context(|| format!("parse {ENV_CHUNK_SIZE} '{chunk_size}' as a byte count"))?;
            config = config.with_chunk_size(chunk_size)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the upload chunk size, which must be positive.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> eyre::Result<Self> {
        ensure!(chunk_size > 0, "upload chunk size must be positive");
        self.chunk_size = chunk_size;
        Ok(self)
    }
}
