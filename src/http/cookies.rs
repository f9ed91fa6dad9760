//! Session cookies and headers.
//!
//! Values from the core are used as-is unless the context config overrides
//! them; see [`CookieOverrides`].

use std::time::Duration;

use crate::{
    config::CookieOverrides,
    handshake::HandshakeInfo,
    querier::{DeviceInfo, FrontendSdk, SDK_NAME_HEADER, SDK_VERSION_HEADER},
    session::{CookieToken, SessionTokens},
};

use super::{SessionRequest, SessionResponse, SetCookie};

pub const ACCESS_TOKEN_COOKIE: &str = "sAccessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "sRefreshToken";
pub const ID_REFRESH_TOKEN_COOKIE: &str = "sIdRefreshToken";

pub const ANTI_CSRF_HEADER: &str = "anti-csrf";
pub const ID_REFRESH_TOKEN_HEADER: &str = "id-refresh-token";
pub const EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";

/// Which configured path override applies to a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenPath {
    Access,
    Refresh,
}

/// Headers a CORS policy must allow for the session flows to work.
#[must_use]
pub fn cors_allowed_headers() -> [&'static str; 3] {
    [ANTI_CSRF_HEADER, SDK_NAME_HEADER, SDK_VERSION_HEADER]
}

/// Headers for an `OPTIONS` preflight response.
pub fn set_options_api_headers<R: SessionResponse + ?Sized>(response: &mut R) {
    for header in cors_allowed_headers() {
        response.append_header(ALLOW_HEADERS, header);
    }
    response.append_header(ALLOW_CREDENTIALS, "true");
}

/// Record the frontend SDK named by the request headers, if both are present.
pub fn save_frontend_info<Q: SessionRequest + ?Sized>(request: &Q, device_info: &DeviceInfo) {
    if let (Some(name), Some(version)) = (
        request.header(SDK_NAME_HEADER),
        request.header(SDK_VERSION_HEADER),
    ) {
        device_info.add_frontend_sdk(FrontendSdk { name, version });
    }
}

#[must_use]
pub fn anti_csrf_header<Q: SessionRequest + ?Sized>(request: &Q) -> Option<String> {
    request.header(ANTI_CSRF_HEADER)
}

pub fn attach_anti_csrf_header<R: SessionResponse + ?Sized>(response: &mut R, value: &str) {
    response.set_header(ANTI_CSRF_HEADER, value.to_string());
    response.append_header(EXPOSE_HEADERS, ANTI_CSRF_HEADER);
}

/// Cookie lifetime for a token expiring at `expiry_ms`, rounded up to whole
/// minutes and never negative.
#[must_use]
pub fn max_age(expiry_ms: u64, now_ms: u64) -> Duration {
    let remaining = expiry_ms.saturating_sub(now_ms);
    Duration::from_secs(remaining.div_ceil(60_000) * 60)
}

fn token_cookie(
    name: &str,
    token: &CookieToken,
    path: TokenPath,
    overrides: &CookieOverrides,
    now_ms: u64,
) -> SetCookie {
    with_overrides(
        SetCookie {
            name: name.to_string(),
            value: token.token.clone(),
            max_age: max_age(token.expiry, now_ms),
            path: token.cookie_path.clone(),
            domain: token.domain.clone(),
            secure: token.cookie_secure,
            http_only: true,
            same_site: token.same_site.clone(),
        },
        path,
        overrides,
    )
}

fn with_overrides(mut cookie: SetCookie, path: TokenPath, overrides: &CookieOverrides) -> SetCookie {
    if let Some(domain) = &overrides.domain {
        cookie.domain = Some(domain.clone());
    }
    if let Some(secure) = overrides.secure {
        cookie.secure = secure;
    }
    if let Some(same_site) = &overrides.same_site {
        cookie.same_site.clone_from(same_site);
    }
    let path_override = match path {
        TokenPath::Access => &overrides.access_token_path,
        TokenPath::Refresh => &overrides.refresh_token_path,
    };
    if let Some(custom) = path_override {
        cookie.path.clone_from(custom);
    }
    cookie
}

pub fn attach_access_token<R: SessionResponse + ?Sized>(
    response: &mut R,
    token: &CookieToken,
    overrides: &CookieOverrides,
) {
    response.set_cookie(token_cookie(
        ACCESS_TOKEN_COOKIE,
        token,
        TokenPath::Access,
        overrides,
        crate::now_ms(),
    ));
}

pub fn attach_refresh_token<R: SessionResponse + ?Sized>(
    response: &mut R,
    token: &CookieToken,
    overrides: &CookieOverrides,
) {
    response.set_cookie(token_cookie(
        REFRESH_TOKEN_COOKIE,
        token,
        TokenPath::Refresh,
        overrides,
        crate::now_ms(),
    ));
}

/// The id-refresh token goes out both as a cookie and as a header readable by
/// frontend code (`<token>;<expiry>`).
pub fn attach_id_refresh_token<R: SessionResponse + ?Sized>(
    response: &mut R,
    token: &CookieToken,
    overrides: &CookieOverrides,
) {
    response.set_header(
        ID_REFRESH_TOKEN_HEADER,
        format!("{};{}", token.token, token.expiry),
    );
    response.append_header(EXPOSE_HEADERS, ID_REFRESH_TOKEN_HEADER);
    response.set_cookie(token_cookie(
        ID_REFRESH_TOKEN_COOKIE,
        token,
        TokenPath::Access,
        overrides,
        crate::now_ms(),
    ));
}

/// Attach a full token set from create or refresh.
pub fn attach_session<R: SessionResponse + ?Sized>(
    response: &mut R,
    tokens: &SessionTokens,
    overrides: &CookieOverrides,
) {
    attach_access_token(response, &tokens.access_token, overrides);
    attach_refresh_token(response, &tokens.refresh_token, overrides);
    attach_id_refresh_token(response, &tokens.id_refresh_token, overrides);
    if let Some(anti_csrf_token) = &tokens.anti_csrf_token {
        attach_anti_csrf_header(response, anti_csrf_token);
    }
}

/// Expire all session cookies and tell the frontend to drop its id-refresh token.
pub fn clear_session<R: SessionResponse + ?Sized>(
    response: &mut R,
    handshake: &HandshakeInfo,
    overrides: &CookieOverrides,
) {
    let cleared = |name: &str, path: &str, kind: TokenPath| {
        with_overrides(
            SetCookie {
                name: name.to_string(),
                value: String::new(),
                max_age: Duration::ZERO,
                path: path.to_string(),
                domain: handshake.cookie_domain.clone(),
                secure: handshake.cookie_secure,
                http_only: true,
                same_site: handshake.same_site.clone(),
            },
            kind,
            overrides,
        )
    };

    response.set_cookie(cleared(
        ACCESS_TOKEN_COOKIE,
        &handshake.access_token_path,
        TokenPath::Access,
    ));
    response.set_cookie(cleared(
        ID_REFRESH_TOKEN_COOKIE,
        &handshake.access_token_path,
        TokenPath::Access,
    ));
    response.set_cookie(cleared(
        REFRESH_TOKEN_COOKIE,
        &handshake.refresh_token_path,
        TokenPath::Refresh,
    ));
    response.set_header(ID_REFRESH_TOKEN_HEADER, "remove".to_string());
    response.append_header(EXPOSE_HEADERS, ID_REFRESH_TOKEN_HEADER);
}
