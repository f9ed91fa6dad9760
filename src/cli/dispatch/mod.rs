//! Map validated command line matches to an [`Action`].

use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use serde_json::Value;

use crate::cli::actions::{
    session::{CreateArgs, RefreshArgs, RevokeArgs, RevokeTarget, SessionsArgs, VerifyArgs},
    Action,
};
use crate::cli::commands::{
    connection,
    session::{
        ARG_ACCESS_TOKEN, ARG_ANTI_CSRF_CHECK, ARG_ANTI_CSRF_TOKEN, ARG_ID_REFRESH_TOKEN,
        ARG_JWT_PAYLOAD, ARG_REFRESH_TOKEN, ARG_SESSION_DATA, ARG_SESSION_HANDLE, ARG_USER_ID,
        CMD_API_VERSION, CMD_CREATE, CMD_HANDSHAKE, CMD_REFRESH, CMD_REVOKE, CMD_SESSIONS,
        CMD_VERIFY,
    },
};

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("missing required argument: --{id}"))
}

fn json_object(matches: &ArgMatches, id: &str) -> Result<Value> {
    let raw = matches.get_one::<String>(id).map_or("{}", String::as_str);
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--{id} is not valid JSON"))?;
    anyhow::ensure!(value.is_object(), "--{id} must be a JSON object");
    Ok(value)
}

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let connection = connection::Options::parse(matches)?;

    let Some((name, sub)) = matches.subcommand() else {
        anyhow::bail!("missing subcommand");
    };

    let action = match name {
        CMD_API_VERSION => Action::ApiVersion(connection),
        CMD_HANDSHAKE => Action::Handshake(connection),
        CMD_CREATE => Action::Create(CreateArgs {
            connection,
            user_id: required(sub, ARG_USER_ID)?,
            jwt_payload: json_object(sub, ARG_JWT_PAYLOAD)?,
            session_data: json_object(sub, ARG_SESSION_DATA)?,
        }),
        CMD_VERIFY => Action::Verify(VerifyArgs {
            connection,
            access_token: SecretString::from(required(sub, ARG_ACCESS_TOKEN)?),
            anti_csrf_token: sub.get_one::<String>(ARG_ANTI_CSRF_TOKEN).cloned(),
            anti_csrf_check: sub.get_flag(ARG_ANTI_CSRF_CHECK),
            id_refresh_token: sub.get_one::<String>(ARG_ID_REFRESH_TOKEN).cloned(),
        }),
        CMD_REFRESH => Action::Refresh(RefreshArgs {
            connection,
            refresh_token: SecretString::from(required(sub, ARG_REFRESH_TOKEN)?),
        }),
        CMD_REVOKE => {
            let handles: Vec<String> = sub
                .get_many::<String>(ARG_SESSION_HANDLE)
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let target = if handles.is_empty() {
                RevokeTarget::User(required(sub, ARG_USER_ID)?)
            } else {
                RevokeTarget::Handles(handles)
            };
            Action::Revoke(RevokeArgs { connection, target })
        }
        CMD_SESSIONS => Action::Sessions(SessionsArgs {
            connection,
            user_id: required(sub, ARG_USER_ID)?,
        }),
        other => anyhow::bail!("unknown subcommand: {other}"),
    };

    Ok(action)
}
