//! Context configuration.
//!
//! Use [`Config::new`] (or [`Config::from_hosts`] for a `;` separated list) and
//! override defaults with the `with_*` methods.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Overrides applied to every cookie this client sets, on top of the values the
/// core returns with each token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOverrides {
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub same_site: Option<String>,
    pub access_token_path: Option<String>,
    pub refresh_token_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hosts: Vec<Url>,
    pub supported_versions: Vec<String>,
    pub api_version_ttl: Duration,
    pub handshake_ttl: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub record_visited_hosts: bool,
    pub cookies: CookieOverrides,
}

impl Config {
    /// Create config for the given core hosts, tried in order.
    #[must_use]
    pub fn new(hosts: Vec<Url>) -> Self {
        Self {
            hosts,
            supported_versions: crate::querier::SUPPORTED_VERSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            api_version_ttl: DEFAULT_CACHE_TTL,
            handshake_ttl: DEFAULT_CACHE_TTL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            record_visited_hosts: false,
            cookies: CookieOverrides::default(),
        }
    }

    /// Create config from a `;` separated host list, e.g.
    /// `http://localhost:3567;https://core.example.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or any entry is not a valid URL.
    pub fn from_hosts(hosts: &str) -> Result<Self> {
        Ok(Self::new(parse_hosts(hosts)?))
    }

    #[must_use]
    pub fn with_supported_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_api_version_ttl(mut self, ttl: Duration) -> Self {
        self.api_version_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_handshake_ttl(mut self, ttl: Duration) -> Self {
        self.handshake_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Record every host that answered, see [`crate::querier::Querier::visited_hosts`].
    #[must_use]
    pub fn with_record_visited_hosts(mut self, record: bool) -> Self {
        self.record_visited_hosts = record;
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookies.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookies.secure = Some(secure);
        self
    }

    #[must_use]
    pub fn with_cookie_same_site(mut self, same_site: impl Into<String>) -> Self {
        self.cookies.same_site = Some(same_site.into());
        self
    }

    #[must_use]
    pub fn with_access_token_path(mut self, path: impl Into<String>) -> Self {
        self.cookies.access_token_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_refresh_token_path(mut self, path: impl Into<String>) -> Self {
        self.cookies.refresh_token_path = Some(path.into());
        self
    }
}

/// Parse a `;` separated list of core addresses. Entries without a scheme
/// default to `http://`.
///
/// # Errors
///
/// Returns [`Error::NoHosts`] for an empty list and [`Error::InvalidHost`] for
/// an entry that is not an http(s) URL with a host.
pub fn parse_hosts(hosts: &str) -> Result<Vec<Url>> {
    let parsed = hosts
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_host)
        .collect::<Result<Vec<_>>>()?;

    if parsed.is_empty() {
        return Err(Error::NoHosts);
    }

    Ok(parsed)
}

fn parse_host(entry: &str) -> Result<Url> {
    let raw = if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{entry}")
    };

    let url = Url::parse(&raw).map_err(|e| Error::InvalidHost {
        host: entry.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidHost {
            host: entry.to_string(),
            reason: "expected an http(s) address".to_string(),
        });
    }

    Ok(url)
}
