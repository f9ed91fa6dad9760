//! Multi-host HTTP client for the session core.
//!
//! Flow Overview:
//! - Every attempt takes the host at the shared cursor and advances the cursor,
//!   whatever the outcome.
//! - Connection failures, timeouts and `5xx` move on to the next host; at most
//!   one attempt per configured host.
//! - `4xx` is the core's answer and is returned at once as [`Error::CoreRejected`].
//! - The API version is negotiated on first use, renegotiated once the API
//!   version TTL elapsed, and sent as `cdi-version` on every other request.

mod device;
mod version;

pub use device::{DeviceInfo, FrontendSdk, SDK_NAME_HEADER, SDK_VERSION_HEADER};
pub use version::{negotiate, ApiVersion};

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use crate::{
    cache::{CacheStore, Expiring},
    config::Config,
    error::{Error, Result},
};

/// Versions of the core driver interface this client speaks.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "2.0"];

pub const API_VERSION_HEADER: &str = "cdi-version";

const API_VERSION_CACHE_KEY: &str = "api-version";

pub const API_VERSION: &str = "/apiversion";
pub const HANDSHAKE: &str = "/handshake";
pub const SESSION: &str = "/session";
pub const SESSION_VERIFY: &str = "/session/verify";
pub const SESSION_REFRESH: &str = "/session/refresh";
pub const SESSION_REGENERATE: &str = "/session/regenerate";
pub const SESSION_REMOVE: &str = "/session/remove";
pub const SESSION_USER: &str = "/session/user";
pub const SESSION_DATA: &str = "/session/data";
pub const JWT_DATA: &str = "/jwt/data";

const DEVICE_INFO_PATHS: [&str; 4] = [SESSION, SESSION_VERIFY, SESSION_REFRESH, HANDSHAKE];

/// A successful core answer. Bodies that are not JSON are kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreResponse {
    Json(Value),
    Text(String),
}

impl CoreResponse {
    /// # Errors
    ///
    /// Returns an error if the core answered with a non JSON body.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => Err(Error::invalid_response(format!(
                "expected a JSON body, got: {text}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct Host {
    base_url: String,
    label: String,
}

impl Host {
    fn new(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default();
        let label = match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            label,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

pub struct Querier {
    client: reqwest::Client,
    hosts: Vec<Host>,
    cursor: AtomicUsize,
    api_version: RwLock<Option<Expiring<ApiVersion>>>,
    supported_versions: Vec<String>,
    api_version_ttl: Duration,
    cache: Arc<dyn CacheStore>,
    device_info: DeviceInfo,
    visited_hosts: Option<Mutex<BTreeSet<String>>>,
}

impl std::fmt::Debug for Querier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Querier")
            .field("hosts", &self.hosts)
            .field(
                "api_version",
                &self
                    .api_version
                    .try_read()
                    .ok()
                    .and_then(|slot| slot.as_ref().map(|v| *v.value())),
            )
            .field("supported_versions", &self.supported_versions)
            .finish_non_exhaustive()
    }
}

impl Querier {
    /// # Errors
    ///
    /// Returns [`Error::NoHosts`] if the config has no hosts, or an error if the
    /// HTTP client cannot be built.
    pub fn new(config: &Config, cache: Arc<dyn CacheStore>) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(Error::NoHosts);
        }

        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            hosts: config.hosts.iter().map(Host::new).collect(),
            cursor: AtomicUsize::new(0),
            api_version: RwLock::new(None),
            supported_versions: config.supported_versions.clone(),
            api_version_ttl: config.api_version_ttl,
            cache,
            device_info: DeviceInfo::new(),
            visited_hosts: config
                .record_visited_hosts
                .then(|| Mutex::new(BTreeSet::new())),
        })
    }

    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Hosts (`host:port`) that answered so far. Empty unless recording is on.
    #[must_use]
    pub fn visited_hosts(&self) -> Vec<String> {
        self.visited_hosts.as_ref().map_or_else(Vec::new, |visited| {
            visited
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .iter()
                .cloned()
                .collect()
        })
    }

    /// The greatest API version both sides support, kept for the API version TTL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DriverIncompatible`] if there is no common version, or
    /// any transport error from `GET /apiversion`.
    pub async fn api_version(&self) -> Result<ApiVersion> {
        if let Some(version) = self.api_version.read().await.as_ref().and_then(Expiring::fresh) {
            return Ok(*version);
        }

        let mut slot = self.api_version.write().await;
        if let Some(version) = slot.as_ref().and_then(Expiring::fresh) {
            return Ok(*version);
        }

        let version = self.resolve_api_version().await?;
        *slot = Some(Expiring::new(version, self.api_version_ttl));
        Ok(version)
    }

    async fn resolve_api_version(&self) -> Result<ApiVersion> {
        match self.cache.get(API_VERSION_CACHE_KEY).await {
            Ok(Some(cached)) => match cached.parse::<ApiVersion>() {
                Ok(version) => {
                    debug!("api version {version} loaded from cache");
                    return Ok(version);
                }
                Err(e) => warn!("ignoring cached api version: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("api version cache read failed: {e}"),
        }

        let response = self
            .dispatch(Method::GET, API_VERSION, None, None, None)
            .await?
            .into_json()?;
        let core_versions: Vec<&str> = response
            .get("versions")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::invalid_response("versions missing from /apiversion"))?
            .iter()
            .filter_map(Value::as_str)
            .collect();

        let version = negotiate(&self.supported_versions, &core_versions)
            .ok_or(Error::DriverIncompatible)?;
        debug!("negotiated api version {version}");

        if let Err(e) = self
            .cache
            .set(API_VERSION_CACHE_KEY, version.to_string(), self.api_version_ttl)
            .await
        {
            warn!("api version cache write failed: {e}");
        }

        Ok(version)
    }

    /// Attach `deviceDriverInfo` to bodies sent to session-relevant paths.
    #[must_use]
    pub fn prepare_body(&self, path: &str, mut body: Value) -> Value {
        if DEVICE_INFO_PATHS.contains(&path) {
            if let Value::Object(map) = &mut body {
                map.insert("deviceDriverInfo".to_string(), self.device_info.driver_info());
            }
        }
        body
    }

    /// # Errors
    ///
    /// See [`Error`]: no host reachable, rejected by the core, or version negotiation failed.
    pub async fn send_get(&self, path: &str, query: &[(&str, &str)]) -> Result<CoreResponse> {
        self.send(Method::GET, path, Some(query), None).await
    }

    /// # Errors
    ///
    /// See [`Querier::send_get`].
    pub async fn send_post(&self, path: &str, body: Value) -> Result<CoreResponse> {
        let body = self.prepare_body(path, body);
        self.send(Method::POST, path, None, Some(&body)).await
    }

    /// # Errors
    ///
    /// See [`Querier::send_get`].
    pub async fn send_put(&self, path: &str, body: &Value) -> Result<CoreResponse> {
        self.send(Method::PUT, path, None, Some(body)).await
    }

    /// # Errors
    ///
    /// See [`Querier::send_get`].
    pub async fn send_delete(&self, path: &str, body: &Value) -> Result<CoreResponse> {
        self.send(Method::DELETE, path, None, Some(body)).await
    }

    fn next_host(&self) -> &Host {
        let len = self.hosts.len();
        let index = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
            .unwrap_or_else(|current| current);
        &self.hosts[index % len]
    }

    fn record_visit(&self, host: &Host) {
        if let Some(visited) = &self.visited_hosts {
            visited
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(host.label.clone());
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<CoreResponse> {
        let version = self.api_version().await?;
        self.dispatch(method, path, query, body, Some(version)).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
        version: Option<ApiVersion>,
    ) -> Result<CoreResponse> {
        for _ in 0..self.hosts.len() {
            let host = self.next_host();
            let url = host.endpoint(path);

            let mut request = self.client.request(method.clone(), &url);
            if let Some(version) = version {
                request = request.header(API_VERSION_HEADER, version.to_string());
            }
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let span = info_span!(
                "core.request",
                http.method = %method,
                url = %url
            );
            let response = match request.send().instrument(span).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(host = %host.label, "core request failed, trying next host: {e}");
                    continue;
                }
            };

            let status = response.status();
            // A host answering 5xx was reached but is not recorded as visited.
            if status.is_server_error() {
                warn!(host = %host.label, "core answered {status}, trying next host");
                continue;
            }

            if path == API_VERSION && status == StatusCode::NOT_FOUND {
                self.record_visit(host);
                return Ok(CoreResponse::Json(json!({ "versions": ["1.0"] })));
            }

            if status.is_client_error() {
                self.record_visit(host);
                let body = response.text().await.unwrap_or_default();
                return Err(Error::CoreRejected {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(host = %host.label, "failed to read core response, trying next host: {e}");
                    continue;
                }
            };
            self.record_visit(host);

            return Ok(match serde_json::from_str(&text) {
                Ok(value) => CoreResponse::Json(value),
                Err(_) => CoreResponse::Text(text),
            });
        }

        Err(Error::CoreUnavailable)
    }
}
