use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Version-prefixed API root every endpoint lives under.
const API_PREFIX: &str = "api/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gateway configuration.
///
/// Required fields are constructor parameters — no runtime "missing
/// field" errors.
///
/// ```rust,ignore
/// use couponmoa::ApiConfig;
///
/// let config = ApiConfig::new("https://api.couponmoa.com".parse()?);
/// // Optional overrides via chaining:
/// let config = config.with_timeout(std::time::Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl ApiConfig {
    /// Create a new configuration against `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("couponmoa/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `COUPONMOA_API_URL`: base URL of the backend (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `COUPONMOA_TIMEOUT_SECS`: per-request timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value fails to parse.
    pub fn from_env() -> Result<Self, Error> {
        let raw = std::env::var("COUPONMOA_API_URL")
            .map_err(|_| Error::Config("COUPONMOA_API_URL is required".into()))?;
        let base_url: Url = raw
            .parse()
            .map_err(|e| Error::Config(format!("COUPONMOA_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(secs) = std::env::var("COUPONMOA_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::Config(format!("COUPONMOA_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the `User-Agent` the gateway sends.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Full URL for an API path, keeping any path prefix on the base
    /// URL.
    pub(crate) fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{API_PREFIX}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }
}
