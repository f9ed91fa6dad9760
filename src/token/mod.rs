//! Offline access token verification.
//!
//! Everything in here is pure: no network, no shared state. Any failure is a
//! [`TokenError`], and every `TokenError` means "ask the core", never "deny".

mod access_token;
mod jwt;

pub use access_token::{get_info_from_access_token, AccessTokenInfo};
pub use jwt::{decode_public_key, verify_jwt_and_get_payload, JWT_HEADER};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid jwt")]
    TokenFormat,
    #[error("jwt header mismatch")]
    HeaderMismatch,
    #[error("invalid base64 encoding")]
    Base64,
    #[error("failed to parse signing public key")]
    KeyParse,
    #[error("jwt verification failed")]
    InvalidSignature,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("invalid access token payload: {0} missing")]
    MissingField(&'static str),
    #[error("expired access token")]
    Expired,
    #[error("provided anti-csrf token is undefined, set do_anti_csrf_check to false if this API does not need it")]
    AntiCsrfUndefined,
    #[error("anti-csrf check failed")]
    AntiCsrfMismatch,
}
