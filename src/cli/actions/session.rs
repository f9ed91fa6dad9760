use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::cli::commands::connection;

use super::{connect, report};

#[derive(Debug)]
pub struct CreateArgs {
    pub connection: connection::Options,
    pub user_id: String,
    pub jwt_payload: Value,
    pub session_data: Value,
}

#[derive(Debug)]
pub struct VerifyArgs {
    pub connection: connection::Options,
    pub access_token: SecretString,
    pub anti_csrf_token: Option<String>,
    pub anti_csrf_check: bool,
    pub id_refresh_token: Option<String>,
}

#[derive(Debug)]
pub struct RefreshArgs {
    pub connection: connection::Options,
    pub refresh_token: SecretString,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RevokeTarget {
    Handles(Vec<String>),
    User(String),
}

#[derive(Debug)]
pub struct RevokeArgs {
    pub connection: connection::Options,
    pub target: RevokeTarget,
}

#[derive(Debug)]
pub struct SessionsArgs {
    pub connection: connection::Options,
    pub user_id: String,
}

/// # Errors
/// Returns an error if the core rejects the session.
pub async fn create(args: CreateArgs) -> Result<()> {
    let functions = connect(&args.connection)?;
    let tokens = functions
        .create_new_session(&args.user_id, args.jwt_payload, args.session_data)
        .await?;
    report(&functions, &tokens)
}

/// # Errors
/// Returns an error if the token is not accepted.
pub async fn verify(args: VerifyArgs) -> Result<()> {
    let functions = connect(&args.connection)?;
    let verified = functions
        .get_session(
            args.access_token.expose_secret(),
            args.anti_csrf_token.as_deref(),
            args.anti_csrf_check,
            args.id_refresh_token.as_deref(),
        )
        .await?;
    report(&functions, &verified)
}

/// # Errors
/// Returns an error if the refresh token is not accepted.
pub async fn refresh(args: RefreshArgs) -> Result<()> {
    let functions = connect(&args.connection)?;
    let tokens = functions
        .refresh_session(args.refresh_token.expose_secret())
        .await?;
    report(&functions, &tokens)
}

/// # Errors
/// Returns an error if the core cannot be reached.
pub async fn revoke(args: RevokeArgs) -> Result<()> {
    let functions = connect(&args.connection)?;
    let output = match args.target {
        RevokeTarget::Handles(handles) if handles.len() == 1 => {
            json!({ "revoked": functions.revoke_session(&handles[0]).await? })
        }
        RevokeTarget::Handles(handles) => {
            json!({ "revoked": functions.revoke_multiple_sessions(&handles).await? })
        }
        RevokeTarget::User(user_id) => {
            json!({ "revoked": functions.revoke_all_sessions_for_user(&user_id).await? })
        }
    };
    report(&functions, &output)
}

/// # Errors
/// Returns an error if the core cannot be reached.
pub async fn sessions(args: SessionsArgs) -> Result<()> {
    let functions = connect(&args.connection)?;
    let handles = functions
        .get_all_session_handles_for_user(&args.user_id)
        .await?;
    report(&functions, &json!({ "sessionHandles": handles }))
}
