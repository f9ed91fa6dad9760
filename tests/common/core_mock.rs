//! Mock session core for integration testing.

use std::sync::Arc;

use serde_json::{json, Value};
use sessionkit::{cache::CacheStore, Config, SessionFunctions};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::keys::{now_ms, HOUR_MS, PUBLIC_KEY};

pub struct MockCore {
    pub server: MockServer,
}

impl MockCore {
    /// Start a core answering `GET /apiversion` with `versions`.
    pub async fn start(versions: &[&str]) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apiversion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": versions })))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Start a core that also answers `POST /handshake` with `handshake`.
    pub async fn with_handshake(versions: &[&str], handshake: Value) -> Self {
        let core = Self::start(versions).await;
        core.mount(
            Mock::given(method("POST"))
                .and(path("/handshake"))
                .respond_with(ResponseTemplate::new(200).set_body_json(handshake)),
        )
        .await;
        core
    }

    pub async fn mount(&self, mock: Mock) {
        mock.mount(&self.server).await;
    }

    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&self.server.uri()).expect("mock server url")
    }

    #[must_use]
    pub fn config(&self) -> Config {
        Config::new(vec![self.url()])
    }

    /// `host:port` as recorded in the visited hosts.
    #[must_use]
    pub fn host_label(&self) -> String {
        let url = self.url();
        format!(
            "{}:{}",
            url.host_str().expect("host"),
            url.port_or_known_default().expect("port")
        )
    }

    #[must_use]
    pub fn functions(&self) -> SessionFunctions {
        SessionFunctions::new(self.config()).expect("session functions")
    }

    #[must_use]
    pub fn functions_with_config(&self, config: Config) -> SessionFunctions {
        SessionFunctions::new(config).expect("session functions")
    }

    #[must_use]
    pub fn functions_with_cache(&self, cache: Arc<dyn CacheStore>) -> SessionFunctions {
        SessionFunctions::with_cache(self.config(), cache).expect("session functions")
    }

    /// Requests received on `path_name`.
    pub async fn requests_to(&self, path_name: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == path_name)
            .collect()
    }
}

/// A handshake body as a 2.x core sends it.
#[must_use]
pub fn handshake_body() -> Value {
    json!({
        "status": "OK",
        "jwtSigningPublicKey": PUBLIC_KEY,
        "jwtSigningPublicKeyExpiryTime": now_ms() + 24 * HOUR_MS,
        "cookieDomain": "example.com",
        "cookieSecure": true,
        "accessTokenPath": "/",
        "refreshTokenPath": "/auth/session/refresh",
        "enableAntiCsrf": false,
        "accessTokenBlacklistingEnabled": false,
        "cookieSameSite": "lax",
        "sessionExpiredStatusCode": 401,
    })
}

/// Same as [`handshake_body`] with `patch` merged on top.
#[must_use]
pub fn handshake_with(patch: &Value) -> Value {
    let mut body = handshake_body();
    if let (Some(body), Some(patch)) = (body.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

#[must_use]
pub fn token(value: &str, path: &str) -> Value {
    json!({
        "token": value,
        "expiry": now_ms() + HOUR_MS,
        "createdTime": now_ms(),
        "cookiePath": path,
        "cookieSecure": true,
        "domain": "example.com",
        "sameSite": "lax",
    })
}

/// A successful create or refresh response from a 2.x core.
#[must_use]
pub fn session_tokens(session_handle: &str, user_id: &str, access_token: &str) -> Value {
    session_tokens_with(
        session_handle,
        user_id,
        access_token,
        "refresh-token",
        "anti-csrf-token",
    )
}

/// Same as [`session_tokens`] with explicit refresh and anti-CSRF tokens.
#[must_use]
pub fn session_tokens_with(
    session_handle: &str,
    user_id: &str,
    access_token: &str,
    refresh_token: &str,
    anti_csrf_token: &str,
) -> Value {
    json!({
        "status": "OK",
        "session": {
            "handle": session_handle,
            "userId": user_id,
            "userDataInJWT": { "role": "member" },
        },
        "accessToken": token(access_token, "/"),
        "refreshToken": token(refresh_token, "/auth/session/refresh"),
        "idRefreshToken": token("id-refresh-token", "/"),
        "antiCsrfToken": anti_csrf_token,
    })
}

/// A successful create or refresh response from a 1.0 core.
#[must_use]
pub fn legacy_session_tokens(session_handle: &str, user_id: &str, access_token: &str) -> Value {
    let expiry = now_ms() + HOUR_MS;
    json!({
        "status": "OK",
        "session": {
            "handle": session_handle,
            "userId": user_id,
            "userDataInJWT": {},
        },
        "accessToken": {
            "token": access_token,
            "expiry": expiry,
            "cookiePath": "/",
            "cookieSecure": false,
            "domain": "legacy.example.com",
        },
        "refreshToken": {
            "token": "refresh-token",
            "expiry": expiry,
            "cookiePath": "/refresh",
            "cookieSecure": false,
            "domain": "legacy.example.com",
        },
        "idRefreshToken": {
            "token": "id-refresh-token",
            "expiry": expiry,
        },
    })
}
