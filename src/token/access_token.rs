use serde_json::{Map, Value};

use super::{jwt::verify_jwt_and_get_payload, TokenError};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenInfo {
    pub session_handle: String,
    pub user_id: String,
    pub refresh_token_hash1: String,
    pub parent_refresh_token_hash1: Option<String>,
    pub user_data: Value,
    pub anti_csrf_token: Option<String>,
    pub expiry_time: u64,
    pub time_created: u64,
}

fn sanitize_string(claims: &Map<String, Value>, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sanitize_number(claims: &Map<String, Value>, key: &str) -> Option<u64> {
    let from_float = |value: f64| (value.is_finite() && value >= 0.0).then(|| value as u64);
    match claims.get(key)? {
        Value::Number(number) => number.as_u64().or_else(|| number.as_f64().and_then(from_float)),
        Value::String(raw) => {
            let raw = raw.trim();
            raw.parse::<u64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, TokenError> {
    value.ok_or(TokenError::MissingField(field))
}

/// Verify `token` against the core's signing key and extract its claims.
///
/// `now_ms` is passed in so callers (and tests) control the clock.
///
/// # Errors
///
/// Any [`TokenError`]: bad structure or signature, missing claims, a missing
/// anti-csrf claim while `do_anti_csrf_check` is set, or an expired token.
pub fn get_info_from_access_token(
    token: &str,
    signing_public_key: &str,
    do_anti_csrf_check: bool,
    now_ms: u64,
) -> Result<AccessTokenInfo, TokenError> {
    let payload = verify_jwt_and_get_payload(token, signing_public_key)?;
    let claims = payload.as_object().ok_or(TokenError::TokenFormat)?;

    let session_handle = required(sanitize_string(claims, "sessionHandle"), "sessionHandle")?;
    let user_id = required(sanitize_string(claims, "userId"), "userId")?;
    let refresh_token_hash1 =
        required(sanitize_string(claims, "refreshTokenHash1"), "refreshTokenHash1")?;
    let parent_refresh_token_hash1 = sanitize_string(claims, "parentRefreshTokenHash1");
    let user_data = claims
        .get("userData")
        .filter(|value| !value.is_null())
        .cloned()
        .ok_or(TokenError::MissingField("userData"))?;
    let anti_csrf_token = sanitize_string(claims, "antiCsrfToken");
    let expiry_time = required(sanitize_number(claims, "expiryTime"), "expiryTime")?;
    let time_created = required(sanitize_number(claims, "timeCreated"), "timeCreated")?;

    if do_anti_csrf_check && anti_csrf_token.is_none() {
        return Err(TokenError::MissingField("antiCsrfToken"));
    }

    if expiry_time <= now_ms {
        return Err(TokenError::Expired);
    }

    Ok(AccessTokenInfo {
        session_handle,
        user_id,
        refresh_token_hash1,
        parent_refresh_token_hash1,
        user_data,
        anti_csrf_token,
        expiry_time,
        time_created,
    })
}
