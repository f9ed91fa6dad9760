//! Signing key and cookie policy published by the core.
//!
//! The snapshot is loaded lazily (memory, then cache, then `POST /handshake`)
//! and kept in memory for the handshake TTL only, after which the next reader
//! reloads it. It is swapped as a whole whenever the core rotates its signing
//! key, so readers never see a key paired with another key's expiry.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    cache::{CacheStore, Expiring},
    error::{Error, Result},
    querier::{ApiVersion, Querier, HANDSHAKE},
};

pub const DEFAULT_SAME_SITE: &str = "none";
pub const DEFAULT_SESSION_EXPIRED_STATUS_CODE: u16 = 440;

/// The core's JWT signing key together with its expiry (epoch ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    #[serde(rename = "jwtSigningPublicKey")]
    pub key: String,
    #[serde(rename = "jwtSigningPublicKeyExpiryTime")]
    pub expiry_time: u64,
}

impl SigningKey {
    #[must_use]
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        self.expiry_time > now_ms
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeInfo {
    #[serde(flatten)]
    pub signing_key: SigningKey,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub access_token_path: String,
    pub refresh_token_path: String,
    pub enable_anti_csrf: bool,
    pub access_token_blacklisting_enabled: bool,
    pub same_site: String,
    pub session_expired_status_code: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeResponse {
    #[serde(flatten)]
    signing_key: SigningKey,
    cookie_domain: Option<String>,
    cookie_secure: bool,
    access_token_path: String,
    refresh_token_path: String,
    enable_anti_csrf: bool,
    access_token_blacklisting_enabled: bool,
    cookie_same_site: Option<String>,
    session_expired_status_code: Option<u16>,
}

impl HandshakeResponse {
    fn normalize(self, version: ApiVersion) -> HandshakeInfo {
        let same_site = if version.is_legacy() {
            None
        } else {
            self.cookie_same_site
        };

        HandshakeInfo {
            signing_key: self.signing_key,
            cookie_domain: self.cookie_domain,
            cookie_secure: self.cookie_secure,
            access_token_path: self.access_token_path,
            refresh_token_path: self.refresh_token_path,
            enable_anti_csrf: self.enable_anti_csrf,
            access_token_blacklisting_enabled: self.access_token_blacklisting_enabled,
            same_site: same_site.unwrap_or_else(|| DEFAULT_SAME_SITE.to_string()),
            session_expired_status_code: self
                .session_expired_status_code
                .unwrap_or(DEFAULT_SESSION_EXPIRED_STATUS_CODE),
        }
    }
}

fn cache_key(version: ApiVersion) -> String {
    format!("handshake:{version}")
}

pub struct Handshake {
    querier: Arc<Querier>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    current: RwLock<Option<Expiring<Arc<HandshakeInfo>>>>,
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Handshake {
    #[must_use]
    pub fn new(querier: Arc<Querier>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            querier,
            cache,
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Current snapshot, loading it on first use and again once the TTL elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is not cached and the core cannot be
    /// reached or answers with an unexpected body.
    pub async fn get(&self) -> Result<Arc<HandshakeInfo>> {
        if let Some(info) = self.current.read().await.as_ref().and_then(Expiring::fresh) {
            return Ok(Arc::clone(info));
        }

        let mut slot = self.current.write().await;
        if let Some(info) = slot.as_ref().and_then(Expiring::fresh) {
            return Ok(Arc::clone(info));
        }

        let info = Arc::new(self.load().await?);
        *slot = Some(Expiring::new(Arc::clone(&info), self.ttl));
        Ok(info)
    }

    /// Replace the signing key and its expiry in one step and re-persist the
    /// whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only when no snapshot was loaded yet and fetching one fails.
    pub async fn update_signing_key(&self, signing_key: SigningKey) -> Result<()> {
        let mut slot = self.current.write().await;
        let mut info = match slot.as_ref().and_then(Expiring::fresh) {
            Some(info) if info.signing_key == signing_key => return Ok(()),
            Some(info) => (**info).clone(),
            None => self.load().await?,
        };

        debug!(
            expiry_time = signing_key.expiry_time,
            "updating jwt signing key"
        );
        info.signing_key = signing_key;

        let version = self.querier.api_version().await?;
        self.persist(version, &info).await;
        *slot = Some(Expiring::new(Arc::new(info), self.ttl));
        Ok(())
    }

    async fn load(&self) -> Result<HandshakeInfo> {
        let version = self.querier.api_version().await?;

        if let Some(info) = self.load_cached(version).await {
            return Ok(info);
        }

        let response = self
            .querier
            .send_post(HANDSHAKE, json!({}))
            .await?
            .into_json()?;
        let info = serde_json::from_value::<HandshakeResponse>(response)
            .map_err(|e| Error::invalid_response(format!("handshake: {e}")))?
            .normalize(version);

        self.persist(version, &info).await;
        Ok(info)
    }

    async fn load_cached(&self, version: ApiVersion) -> Option<HandshakeInfo> {
        match self.cache.get(&cache_key(version)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(info) => {
                    debug!("handshake loaded from cache");
                    Some(info)
                }
                Err(e) => {
                    warn!("ignoring cached handshake: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("handshake cache read failed: {e}");
                None
            }
        }
    }

    async fn persist(&self, version: ApiVersion, info: &HandshakeInfo) {
        let raw = match serde_json::to_string(info) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("failed to encode handshake for cache: {e}");
                return;
            }
        };
        if let Err(e) = self.cache.set(&cache_key(version), raw, self.ttl).await {
            warn!("handshake cache write failed: {e}");
        }
    }
}
