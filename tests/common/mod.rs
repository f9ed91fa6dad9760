#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

pub mod core_mock;
pub mod keys;
pub mod transport;

pub use core_mock::{
    handshake_body, handshake_with, legacy_session_tokens, session_tokens, session_tokens_with,
    token, MockCore,
};
pub use keys::{access_token, claims, now_ms, sign, HOUR_MS, PUBLIC_KEY};
pub use transport::{TestRequest, TestResponse};
