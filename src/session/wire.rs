//! Core response shapes.
//!
//! Each response is normalized into one canonical struct right after the HTTP
//! call, so nothing past this module cares which API version answered.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    handshake::{SigningKey, DEFAULT_SAME_SITE},
    querier::ApiVersion,
};

/// A token plus the cookie attributes the core wants it stored with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieToken {
    pub token: String,
    /// Epoch milliseconds.
    pub expiry: u64,
    pub domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_path: String,
    pub same_site: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub handle: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userDataInJWT", default)]
    pub user_data_in_jwt: Value,
}

/// Everything a new or rotated session hands to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub session: SessionIdentity,
    pub access_token: CookieToken,
    pub refresh_token: CookieToken,
    pub id_refresh_token: CookieToken,
    pub anti_csrf_token: Option<String>,
}

/// A verified (or regenerated) session, with the new access token when the
/// core issued one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSession {
    pub session: SessionIdentity,
    pub access_token: Option<CookieToken>,
}

/// Revocation result: API 1.0 reports a count, later versions the handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RevokedSessions {
    Count(u64),
    Handles(Vec<String>),
}

impl RevokedSessions {
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Count(count) => *count,
            Self::Handles(handles) => handles.len() as u64,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CoreStatus {
    Ok,
    Unauthorised(String),
    Other(String),
}

pub(crate) fn status(response: &Value) -> Result<CoreStatus> {
    let status = response
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_response("status missing"))?;
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(status)
        .to_string();

    Ok(match status {
        "OK" => CoreStatus::Ok,
        "UNAUTHORISED" => CoreStatus::Unauthorised(message),
        _ => CoreStatus::Other(message),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireToken {
    token: String,
    expiry: u64,
    domain: Option<String>,
    cookie_secure: Option<bool>,
    cookie_path: Option<String>,
    same_site: Option<String>,
}

impl WireToken {
    /// On API 1.0 tokens carry no `sameSite`, and the id-refresh token carries
    /// no cookie attributes at all: it inherits the access token's.
    fn normalize(self, version: ApiVersion, inherit_from: Option<&CookieToken>) -> Result<CookieToken> {
        let missing = |field: &str| Error::invalid_response(format!("token {field} missing"));

        if version.is_legacy() {
            let (domain, cookie_secure, cookie_path) = match inherit_from {
                Some(access) => (
                    access.domain.clone(),
                    access.cookie_secure,
                    access.cookie_path.clone(),
                ),
                None => (
                    self.domain,
                    self.cookie_secure.ok_or_else(|| missing("cookieSecure"))?,
                    self.cookie_path.ok_or_else(|| missing("cookiePath"))?,
                ),
            };
            return Ok(CookieToken {
                token: self.token,
                expiry: self.expiry,
                domain,
                cookie_secure,
                cookie_path,
                same_site: DEFAULT_SAME_SITE.to_string(),
            });
        }

        Ok(CookieToken {
            token: self.token,
            expiry: self.expiry,
            domain: self.domain,
            cookie_secure: self.cookie_secure.ok_or_else(|| missing("cookieSecure"))?,
            cookie_path: self.cookie_path.ok_or_else(|| missing("cookiePath"))?,
            same_site: self
                .same_site
                .unwrap_or_else(|| DEFAULT_SAME_SITE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSessionTokens {
    session: SessionIdentity,
    access_token: WireToken,
    refresh_token: WireToken,
    id_refresh_token: WireToken,
    anti_csrf_token: Option<String>,
    #[serde(flatten)]
    signing_key: Option<SigningKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVerifiedSession {
    session: SessionIdentity,
    access_token: Option<WireToken>,
    #[serde(flatten)]
    signing_key: Option<SigningKey>,
}

fn decode<T: serde::de::DeserializeOwned>(response: Value, what: &str) -> Result<T> {
    serde_json::from_value(response).map_err(|e| Error::invalid_response(format!("{what}: {e}")))
}

/// Normalize a create or refresh response. The signing key is returned
/// separately when the core included one.
pub(crate) fn session_tokens(
    response: Value,
    version: ApiVersion,
) -> Result<(SessionTokens, Option<SigningKey>)> {
    let wire: WireSessionTokens = decode(response, "session tokens")?;
    let access_token = wire.access_token.normalize(version, None)?;
    let refresh_token = wire.refresh_token.normalize(version, None)?;
    let id_refresh_token = wire
        .id_refresh_token
        .normalize(version, Some(&access_token))?;

    Ok((
        SessionTokens {
            session: wire.session,
            access_token,
            refresh_token,
            id_refresh_token,
            anti_csrf_token: wire.anti_csrf_token,
        },
        wire.signing_key,
    ))
}

/// Normalize a verify or regenerate response.
pub(crate) fn verified_session(
    response: Value,
    version: ApiVersion,
) -> Result<(VerifiedSession, Option<SigningKey>)> {
    let wire: WireVerifiedSession = decode(response, "verified session")?;
    let access_token = wire
        .access_token
        .map(|token| token.normalize(version, None))
        .transpose()?;

    Ok((
        VerifiedSession {
            session: wire.session,
            access_token,
        },
        wire.signing_key,
    ))
}

pub(crate) fn revoked_sessions(response: &Value, version: ApiVersion) -> Result<RevokedSessions> {
    if version.is_legacy() {
        return response
            .get("numberOfSessionsRevoked")
            .and_then(Value::as_u64)
            .map(RevokedSessions::Count)
            .ok_or_else(|| Error::invalid_response("numberOfSessionsRevoked missing"));
    }

    session_handles(response, "sessionHandlesRevoked").map(RevokedSessions::Handles)
}

pub(crate) fn session_handles(response: &Value, field: &str) -> Result<Vec<String>> {
    response
        .get(field)
        .and_then(Value::as_array)
        .map(|handles| {
            handles
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .ok_or_else(|| Error::invalid_response(format!("{field} missing")))
}

/// `userId` and `handle` of the session a replayed refresh token belonged to.
pub(crate) fn theft_details(response: &Value) -> Result<(String, String)> {
    let session = response
        .get("session")
        .ok_or_else(|| Error::invalid_response("session missing from token theft response"))?;
    let field = |name: &str| {
        session
            .get(name)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::invalid_response(format!("session.{name} missing")))
    };
    Ok((field("userId")?, field("handle")?))
}
