//! Error taxonomy for session operations.
//!
//! Every failure maps onto one of four outcomes the caller has to react to
//! differently, see [`ErrorKind`]. Transport failures are retried inside the
//! querier before they ever surface here; protocol outcomes are never retried.

use thiserror::Error;

use crate::token::TokenError;

pub const DRIVER_NOT_COMPATIBLE_MESSAGE: &str =
    "current driver version is not compatible with the core version on your host/s";

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How a caller should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Infrastructure or configuration problem, always fatal.
    General,
    /// The session does not exist anymore; clear all session state on the client.
    Unauthorised,
    /// The access token could not be accepted; call the refresh flow before giving up.
    TryRefreshToken,
    /// A rotated refresh token was replayed; revoke the session and force a new login.
    TokenTheftDetected,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("please provide at least one core address")]
    NoHosts,
    #[error("invalid core host {host}: {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("no core available to query")]
    CoreUnavailable,
    #[error("core rejected {path} with status {status}: {body}")]
    CoreRejected {
        path: String,
        status: u16,
        body: String,
    },
    #[error("{}", DRIVER_NOT_COMPATIBLE_MESSAGE)]
    DriverIncompatible,
    #[error("{operation} is not supported by core api version {version}, please upgrade the core")]
    Unsupported {
        operation: &'static str,
        version: String,
    },
    #[error("invalid core response: {0}")]
    InvalidResponse(String),
    #[error("http client error")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    General(String),
    #[error("unauthorised: {0}")]
    Unauthorised(String),
    #[error("try refresh token: {0}")]
    TryRefreshToken(String),
    #[error("token theft detected for session {session_handle}")]
    TokenTheftDetected {
        user_id: String,
        session_handle: String,
    },
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorised(_) => ErrorKind::Unauthorised,
            Self::TryRefreshToken(_) => ErrorKind::TryRefreshToken,
            Self::TokenTheftDetected { .. } => ErrorKind::TokenTheftDetected,
            Self::NoHosts
            | Self::InvalidHost { .. }
            | Self::CoreUnavailable
            | Self::CoreRejected { .. }
            | Self::DriverIncompatible
            | Self::Unsupported { .. }
            | Self::InvalidResponse(_)
            | Self::Http(_)
            | Self::General(_) => ErrorKind::General,
        }
    }

    #[must_use]
    pub fn is_unauthorised(&self) -> bool {
        self.kind() == ErrorKind::Unauthorised
    }

    #[must_use]
    pub fn is_try_refresh_token(&self) -> bool {
        self.kind() == ErrorKind::TryRefreshToken
    }

    #[must_use]
    pub fn is_token_theft_detected(&self) -> bool {
        self.kind() == ErrorKind::TokenTheftDetected
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        Self::TryRefreshToken(err.to_string())
    }
}
