use clap::{Arg, ArgAction, ArgGroup, Command};

pub const CMD_API_VERSION: &str = "api-version";
pub const CMD_HANDSHAKE: &str = "handshake";
pub const CMD_CREATE: &str = "create";
pub const CMD_VERIFY: &str = "verify";
pub const CMD_REFRESH: &str = "refresh";
pub const CMD_REVOKE: &str = "revoke";
pub const CMD_SESSIONS: &str = "sessions";

pub const ARG_USER_ID: &str = "user-id";
pub const ARG_JWT_PAYLOAD: &str = "jwt-payload";
pub const ARG_SESSION_DATA: &str = "session-data";
pub const ARG_ACCESS_TOKEN: &str = "access-token";
pub const ARG_ANTI_CSRF_TOKEN: &str = "anti-csrf-token";
pub const ARG_ANTI_CSRF_CHECK: &str = "anti-csrf-check";
pub const ARG_ID_REFRESH_TOKEN: &str = "id-refresh-token";
pub const ARG_REFRESH_TOKEN: &str = "refresh-token";
pub const ARG_SESSION_HANDLE: &str = "handle";

fn user_id_arg() -> Arg {
    Arg::new(ARG_USER_ID)
        .long(ARG_USER_ID)
        .help("User the sessions belong to")
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(Command::new(CMD_API_VERSION).about("Negotiate the API version with the core"))
        .subcommand(Command::new(CMD_HANDSHAKE).about("Fetch the handshake snapshot"))
        .subcommand(
            Command::new(CMD_CREATE)
                .about("Create a session")
                .arg(user_id_arg().required(true))
                .arg(
                    Arg::new(ARG_JWT_PAYLOAD)
                        .long(ARG_JWT_PAYLOAD)
                        .help("JSON object embedded in the access token")
                        .default_value("{}"),
                )
                .arg(
                    Arg::new(ARG_SESSION_DATA)
                        .long(ARG_SESSION_DATA)
                        .help("JSON object stored with the session on the core")
                        .default_value("{}"),
                ),
        )
        .subcommand(
            Command::new(CMD_VERIFY)
                .about("Verify an access token")
                .arg(
                    Arg::new(ARG_ACCESS_TOKEN)
                        .long(ARG_ACCESS_TOKEN)
                        .help("Access token to verify")
                        .env("SESSIONKIT_ACCESS_TOKEN")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_ANTI_CSRF_TOKEN)
                        .long(ARG_ANTI_CSRF_TOKEN)
                        .help("Anti-CSRF token sent alongside the access token"),
                )
                .arg(
                    Arg::new(ARG_ANTI_CSRF_CHECK)
                        .long(ARG_ANTI_CSRF_CHECK)
                        .help("Enforce the anti-CSRF check")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new(ARG_ID_REFRESH_TOKEN)
                        .long(ARG_ID_REFRESH_TOKEN)
                        .help("Id-refresh token; without it the session is treated as gone"),
                ),
        )
        .subcommand(
            Command::new(CMD_REFRESH).about("Rotate a refresh token").arg(
                Arg::new(ARG_REFRESH_TOKEN)
                    .long(ARG_REFRESH_TOKEN)
                    .help("Refresh token to rotate")
                    .env("SESSIONKIT_REFRESH_TOKEN")
                    .hide_env_values(true)
                    .required(true),
            ),
        )
        .subcommand(
            Command::new(CMD_REVOKE)
                .about("Revoke sessions by handle or for a user")
                .arg(
                    Arg::new(ARG_SESSION_HANDLE)
                        .long(ARG_SESSION_HANDLE)
                        .help("Session handle to revoke, repeat for several")
                        .action(ArgAction::Append),
                )
                .arg(user_id_arg())
                .group(
                    ArgGroup::new("target")
                        .args([ARG_SESSION_HANDLE, ARG_USER_ID])
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_SESSIONS)
                .about("List session handles for a user")
                .arg(user_id_arg().required(true)),
        )
}
