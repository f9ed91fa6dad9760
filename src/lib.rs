//! # Sessionkit (Session Client for a Remote Core)
//!
//! `sessionkit` issues, verifies, rotates and revokes authentication sessions whose
//! source of truth lives in a remote session core reachable over HTTP. A session is
//! carried by three tokens:
//!
//! - an **access token**: short-lived, RS256 signed, verifiable offline,
//! - a **refresh token**: single use per rotation, exchanged for a new pair,
//! - an **id-refresh token**: an unsigned marker whose presence says a session should exist.
//!
//! ## Fast Path
//!
//! Most verifications never leave the process. The core's signing key is fetched once
//! through the handshake and cached; while it is unexpired, access tokens are verified
//! locally. A local success is trusted only when access-token blacklisting is disabled and
//! the token was minted directly from the latest refresh token. A local failure is never
//! final: the core gets the last word because it knows about revocations the client does not.
//!
//! ## Core Communication
//!
//! The [`querier::Querier`] round-robins over several interchangeable core replicas,
//! fails over on connection errors and `5xx` responses, and negotiates the API version
//! (`cdi-version` header) once per context.
//!
//! ## Entry Point
//!
//! Build a [`Config`], then a [`SessionFunctions`] context, and keep it for the life of
//! the process. A fresh context is a clean slate (no cached version, handshake or cursor).

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod handshake;
pub mod http;
pub mod querier;
pub mod session;
pub mod token;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use session::{Session, SessionFunctions};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Driver name reported to the core in `deviceDriverInfo`.
pub const DRIVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Driver version reported to the core in `deviceDriverInfo`.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current time in epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
