//! Session protocol: create, verify, rotate, revoke.
//!
//! Verification tries the access token locally first. A local success is
//! final only when blacklisting is off and the token was minted straight from
//! the latest refresh token; anything else, including every local failure, is
//! settled by `POST /session/verify`.

mod handle;
mod wire;

pub use handle::Session;
pub use wire::{CookieToken, RevokedSessions, SessionIdentity, SessionTokens, VerifiedSession};

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::{
    cache::{CacheStore, MemoryCache},
    config::Config,
    error::{Error, Result},
    handshake::{Handshake, HandshakeInfo, SigningKey},
    querier::{
        ApiVersion, Querier, JWT_DATA, SESSION, SESSION_DATA, SESSION_REFRESH,
        SESSION_REGENERATE, SESSION_REMOVE, SESSION_USER, SESSION_VERIFY,
    },
    token::{get_info_from_access_token, TokenError},
};
use wire::CoreStatus;

/// Process-wide session context. Cheap to clone; clones share the host
/// cursor, the negotiated version and the handshake snapshot.
#[derive(Clone)]
pub struct SessionFunctions {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    querier: Arc<Querier>,
    handshake: Handshake,
}

impl std::fmt::Debug for SessionFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFunctions")
            .field("querier", &self.inner.querier)
            .finish_non_exhaustive()
    }
}

/// Empty payloads are sent as `{}`.
fn payload_or_empty(payload: Value) -> Value {
    match payload {
        Value::Null => json!({}),
        Value::Array(items) if items.is_empty() => json!({}),
        payload => payload,
    }
}

fn required_payload(payload: Value, what: &str) -> Result<Value> {
    if payload.is_null() {
        return Err(Error::General(format!(
            "{what} passed to the function can't be null, pass an empty object instead"
        )));
    }
    Ok(payload_or_empty(payload))
}

/// Outcome of verifying an access token without the core.
///
/// `Ok(None)` means the token is fine but the core still has to confirm it.
fn verify_locally(
    handshake: &HandshakeInfo,
    access_token: &str,
    anti_csrf_token: Option<&str>,
    do_anti_csrf_check: bool,
    now_ms: u64,
) -> std::result::Result<Option<SessionIdentity>, TokenError> {
    if !handshake.signing_key.is_valid_at(now_ms) {
        return Ok(None);
    }

    let require_anti_csrf = handshake.enable_anti_csrf && do_anti_csrf_check;
    let info = get_info_from_access_token(
        access_token,
        &handshake.signing_key.key,
        require_anti_csrf,
        now_ms,
    )?;

    if require_anti_csrf {
        match anti_csrf_token {
            None => return Err(TokenError::AntiCsrfUndefined),
            Some(provided) if info.anti_csrf_token.as_deref() != Some(provided) => {
                return Err(TokenError::AntiCsrfMismatch);
            }
            Some(_) => {}
        }
    }

    if handshake.access_token_blacklisting_enabled || info.parent_refresh_token_hash1.is_some() {
        return Ok(None);
    }

    Ok(Some(SessionIdentity {
        handle: info.session_handle,
        user_id: info.user_id,
        user_data_in_jwt: info.user_data,
    }))
}

impl SessionFunctions {
    /// Build a context with an in-process cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the config has no hosts or the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_cache(config, Arc::new(MemoryCache::new()))
    }

    /// Build a context on a shared cache backend.
    ///
    /// # Errors
    ///
    /// See [`SessionFunctions::new`].
    pub fn with_cache(config: Config, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let querier = Arc::new(Querier::new(&config, Arc::clone(&cache))?);
        let handshake = Handshake::new(Arc::clone(&querier), cache, config.handshake_ttl);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                querier,
                handshake,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn querier(&self) -> &Querier {
        &self.inner.querier
    }

    #[must_use]
    pub fn handshake(&self) -> &Handshake {
        &self.inner.handshake
    }

    /// # Errors
    ///
    /// See [`Querier::api_version`].
    pub async fn api_version(&self) -> Result<ApiVersion> {
        self.inner.querier.api_version().await
    }

    async fn update_signing_key(&self, signing_key: Option<SigningKey>) -> Result<()> {
        match signing_key {
            Some(signing_key) => self.inner.handshake.update_signing_key(signing_key).await,
            None => Ok(()),
        }
    }

    async fn require_jwt_payload_support(&self, operation: &'static str) -> Result<ApiVersion> {
        let version = self.api_version().await?;
        if version.is_legacy() {
            return Err(Error::Unsupported {
                operation,
                version: version.to_string(),
            });
        }
        Ok(version)
    }

    /// Create a session for `user_id`. Always goes to the core.
    ///
    /// # Errors
    ///
    /// Returns a general error if the core cannot be reached or answers with
    /// an unexpected body.
    #[instrument(skip(self, jwt_payload, session_data))]
    pub async fn create_new_session(
        &self,
        user_id: &str,
        jwt_payload: Value,
        session_data: Value,
    ) -> Result<SessionTokens> {
        let version = self.api_version().await?;
        let body = json!({
            "userId": user_id,
            "userDataInJWT": payload_or_empty(jwt_payload),
            "userDataInDatabase": payload_or_empty(session_data),
        });

        let response = self.querier().send_post(SESSION, body).await?.into_json()?;
        let (tokens, signing_key) = wire::session_tokens(response, version)?;
        self.update_signing_key(signing_key).await?;

        debug!(session_handle = %tokens.session.handle, "session created");
        Ok(tokens)
    }

    /// Verify an access token, locally when possible.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorised`] when `id_refresh_token` is absent or the core
    ///   no longer knows the session.
    /// - [`Error::TryRefreshToken`] when the core does not accept the access token.
    /// - A general error on transport failures.
    #[instrument(skip(self, access_token, anti_csrf_token, id_refresh_token))]
    pub async fn get_session(
        &self,
        access_token: &str,
        anti_csrf_token: Option<&str>,
        do_anti_csrf_check: bool,
        id_refresh_token: Option<&str>,
    ) -> Result<VerifiedSession> {
        if id_refresh_token.is_none() {
            return Err(Error::Unauthorised("id refresh token missing".to_string()));
        }

        let handshake = self.inner.handshake.get().await?;
        match verify_locally(
            &handshake,
            access_token,
            anti_csrf_token,
            do_anti_csrf_check,
            crate::now_ms(),
        ) {
            Ok(Some(session)) => {
                debug!(session_handle = %session.handle, "session verified locally");
                return Ok(VerifiedSession {
                    session,
                    access_token: None,
                });
            }
            Ok(None) => debug!("local verification needs confirmation from the core"),
            Err(e) => debug!("local verification failed, asking the core: {e}"),
        }

        let mut body = json!({
            "accessToken": access_token,
            "doAntiCsrfCheck": do_anti_csrf_check,
        });
        if let Some(anti_csrf_token) = anti_csrf_token {
            body["antiCsrfToken"] = json!(anti_csrf_token);
        }

        let version = self.api_version().await?;
        let response = self
            .querier()
            .send_post(SESSION_VERIFY, body)
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Ok => {
                let (verified, signing_key) = wire::verified_session(response, version)?;
                self.update_signing_key(signing_key).await?;
                Ok(verified)
            }
            CoreStatus::Unauthorised(message) => Err(Error::Unauthorised(message)),
            CoreStatus::Other(message) => Err(Error::TryRefreshToken(message)),
        }
    }

    /// Exchange a refresh token for a new token set.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorised`] when the session is gone.
    /// - [`Error::TokenTheftDetected`] when an already rotated refresh token was replayed.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokens> {
        let version = self.api_version().await?;
        let response = self
            .querier()
            .send_post(SESSION_REFRESH, json!({ "refreshToken": refresh_token }))
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Ok => {
                let (tokens, signing_key) = wire::session_tokens(response, version)?;
                self.update_signing_key(signing_key).await?;
                Ok(tokens)
            }
            CoreStatus::Unauthorised(message) => Err(Error::Unauthorised(message)),
            CoreStatus::Other(_) => {
                let (user_id, session_handle) = wire::theft_details(&response)?;
                Err(Error::TokenTheftDetected {
                    user_id,
                    session_handle,
                })
            }
        }
    }

    async fn remove_sessions(&self, body: Value) -> Result<RevokedSessions> {
        let version = self.api_version().await?;
        let response = if version.is_legacy() {
            self.querier().send_delete(SESSION, &body).await?
        } else {
            self.querier().send_post(SESSION_REMOVE, body).await?
        };
        wire::revoked_sessions(&response.into_json()?, version)
    }

    /// Revoke every session of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a general error on transport failures or an unexpected body.
    #[instrument(skip(self))]
    pub async fn revoke_all_sessions_for_user(&self, user_id: &str) -> Result<RevokedSessions> {
        self.remove_sessions(json!({ "userId": user_id })).await
    }

    /// Revoke one session. `false` when it did not exist (anymore).
    ///
    /// # Errors
    ///
    /// Returns a general error on transport failures or an unexpected body.
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, session_handle: &str) -> Result<bool> {
        let revoked = self
            .remove_sessions(json!({ "sessionHandles": [session_handle] }))
            .await?;
        Ok(revoked.count() == 1)
    }

    /// # Errors
    ///
    /// Returns a general error on transport failures or an unexpected body.
    #[instrument(skip(self))]
    pub async fn revoke_multiple_sessions(
        &self,
        session_handles: &[String],
    ) -> Result<RevokedSessions> {
        self.remove_sessions(json!({ "sessionHandles": session_handles }))
            .await
    }

    /// # Errors
    ///
    /// Returns a general error on transport failures or an unexpected body.
    #[instrument(skip(self))]
    pub async fn get_all_session_handles_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let response = self
            .querier()
            .send_get(SESSION_USER, &[("userId", user_id)])
            .await?
            .into_json()?;
        wire::session_handles(&response, "sessionHandles")
    }

    /// Out-of-band data stored with the session, never sent to the client.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthorised`] if the session does not exist.
    #[instrument(skip(self))]
    pub async fn get_session_data(&self, session_handle: &str) -> Result<Value> {
        let response = self
            .querier()
            .send_get(SESSION_DATA, &[("sessionHandle", session_handle)])
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Ok => response
                .get("userDataInDatabase")
                .cloned()
                .ok_or_else(|| Error::invalid_response("userDataInDatabase missing")),
            CoreStatus::Unauthorised(message) | CoreStatus::Other(message) => {
                Err(Error::Unauthorised(message))
            }
        }
    }

    /// # Errors
    ///
    /// A general error for a null payload, [`Error::Unauthorised`] if the
    /// session does not exist.
    #[instrument(skip(self, session_data))]
    pub async fn update_session_data(&self, session_handle: &str, session_data: Value) -> Result<()> {
        let session_data = required_payload(session_data, "session data")?;
        let response = self
            .querier()
            .send_put(
                SESSION_DATA,
                &json!({
                    "sessionHandle": session_handle,
                    "userDataInDatabase": session_data,
                }),
            )
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Unauthorised(message) => Err(Error::Unauthorised(message)),
            CoreStatus::Ok | CoreStatus::Other(_) => Ok(()),
        }
    }

    /// The payload embedded in the session's access tokens. Needs API 2.0.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] on API 1.0, [`Error::Unauthorised`] if the session
    /// does not exist.
    #[instrument(skip(self))]
    pub async fn get_jwt_payload(&self, session_handle: &str) -> Result<Value> {
        self.require_jwt_payload_support("get_jwt_payload").await?;
        let response = self
            .querier()
            .send_get(JWT_DATA, &[("sessionHandle", session_handle)])
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Ok => response
                .get("userDataInJWT")
                .cloned()
                .ok_or_else(|| Error::invalid_response("userDataInJWT missing")),
            CoreStatus::Unauthorised(message) | CoreStatus::Other(message) => {
                Err(Error::Unauthorised(message))
            }
        }
    }

    /// Replace the JWT payload for tokens minted from now on. Needs API 2.0.
    ///
    /// # Errors
    ///
    /// A general error for a null payload or on API 1.0, [`Error::Unauthorised`]
    /// if the session does not exist.
    #[instrument(skip(self, jwt_payload))]
    pub async fn update_jwt_payload(&self, session_handle: &str, jwt_payload: Value) -> Result<()> {
        let jwt_payload = required_payload(jwt_payload, "jwt payload")?;
        self.require_jwt_payload_support("update_jwt_payload").await?;
        let response = self
            .querier()
            .send_put(
                JWT_DATA,
                &json!({
                    "sessionHandle": session_handle,
                    "userDataInJWT": jwt_payload,
                }),
            )
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Unauthorised(message) => Err(Error::Unauthorised(message)),
            CoreStatus::Ok | CoreStatus::Other(_) => Ok(()),
        }
    }

    /// Re-issue the access token with a new JWT payload. Needs API 2.0.
    ///
    /// # Errors
    ///
    /// A general error for a null payload or on API 1.0, [`Error::Unauthorised`]
    /// if the session does not exist.
    #[instrument(skip(self, access_token, jwt_payload))]
    pub async fn regenerate_session(
        &self,
        access_token: &str,
        jwt_payload: Value,
    ) -> Result<VerifiedSession> {
        let jwt_payload = required_payload(jwt_payload, "jwt payload")?;
        let version = self.require_jwt_payload_support("regenerate_session").await?;
        let response = self
            .querier()
            .send_post(
                SESSION_REGENERATE,
                json!({
                    "accessToken": access_token,
                    "userDataInJWT": jwt_payload,
                }),
            )
            .await?
            .into_json()?;

        match wire::status(&response)? {
            CoreStatus::Unauthorised(message) => Err(Error::Unauthorised(message)),
            CoreStatus::Ok | CoreStatus::Other(_) => {
                let (regenerated, _) = wire::verified_session(response, version)?;
                Ok(regenerated)
            }
        }
    }
}
