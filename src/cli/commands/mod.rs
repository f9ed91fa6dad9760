pub mod connection;
pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("sessionkit")
        .about("Session core diagnostics")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true);

    let command = connection::with_args(command);
    let command = session::with_subcommands(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "sessionkit");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session core diagnostics".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_hosts_and_subcommand() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "sessionkit",
            "--hosts",
            "http://localhost:3567;http://localhost:3568",
            "--record-visited-hosts",
            "sessions",
            "--user-id",
            "user-1",
        ]);

        assert_eq!(
            matches.get_one::<String>(connection::ARG_CORE_HOSTS).cloned(),
            Some("http://localhost:3567;http://localhost:3568".to_string())
        );
        assert!(matches.get_flag(connection::ARG_RECORD_VISITED_HOSTS));

        let Some((name, sub)) = matches.subcommand() else {
            panic!("expected a subcommand");
        };
        assert_eq!(name, session::CMD_SESSIONS);
        assert_eq!(
            sub.get_one::<String>(session::ARG_USER_ID).cloned(),
            Some("user-1".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SESSIONKIT_CORE_HOSTS", Some("http://core.tld:3567")),
                ("SESSIONKIT_REQUEST_TIMEOUT", Some("5")),
                ("SESSIONKIT_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["sessionkit", "api-version"]);
                assert_eq!(
                    matches.get_one::<String>(connection::ARG_CORE_HOSTS).cloned(),
                    Some("http://core.tld:3567".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<u64>(connection::ARG_REQUEST_TIMEOUT)
                        .copied(),
                    Some(5)
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("SESSIONKIT_LOG_LEVEL", Some(level)),
                    ("SESSIONKIT_CORE_HOSTS", Some("http://core.tld:3567")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["sessionkit", "handshake"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_revoke_requires_target() {
        let command = new();
        let result = command.try_get_matches_from(vec![
            "sessionkit",
            "--hosts",
            "http://localhost:3567",
            "revoke",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_revoke_multiple_handles() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "sessionkit",
            "--hosts",
            "http://localhost:3567",
            "revoke",
            "--handle",
            "h1",
            "--handle",
            "h2",
        ]);
        let Some((_, sub)) = matches.subcommand() else {
            panic!("expected a subcommand");
        };
        let handles: Vec<String> = sub
            .get_many::<String>(session::ARG_SESSION_HANDLE)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        assert_eq!(handles, vec!["h1".to_string(), "h2".to_string()]);
    }
}
