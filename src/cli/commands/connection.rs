use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::{self, Config};

pub const ARG_CORE_HOSTS: &str = "hosts";
pub const ARG_RECORD_VISITED_HOSTS: &str = "record-visited-hosts";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

/// Connection options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Options {
    pub hosts: String,
    pub record_visited_hosts: bool,
    pub request_timeout: u64,
}

impl Options {
    /// Parse core connection arguments from matches.
    ///
    /// # Errors
    /// Returns an error if `--hosts` is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let hosts = match matches.get_one::<String>(ARG_CORE_HOSTS).cloned() {
            Some(value) if !value.trim().is_empty() => value,
            _ => anyhow::bail!("missing required argument: --{ARG_CORE_HOSTS}"),
        };

        Ok(Self {
            hosts,
            record_visited_hosts: matches.get_flag(ARG_RECORD_VISITED_HOSTS),
            request_timeout: matches
                .get_one::<u64>(ARG_REQUEST_TIMEOUT)
                .copied()
                .unwrap_or(30),
        })
    }

    /// Build a client [`Config`] from the parsed options.
    ///
    /// # Errors
    /// Returns an error if the host list is malformed.
    pub fn config(&self) -> anyhow::Result<Config> {
        let hosts = config::parse_hosts(&self.hosts)?;
        Ok(Config::new(hosts)
            .with_record_visited_hosts(self.record_visited_hosts)
            .with_request_timeout(Duration::from_secs(self.request_timeout)))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CORE_HOSTS)
                .long(ARG_CORE_HOSTS)
                .help("Core hosts, `;` separated, example: http://core-1:3567;http://core-2:3567")
                .env("SESSIONKIT_CORE_HOSTS"),
        )
        .arg(
            Arg::new(ARG_RECORD_VISITED_HOSTS)
                .long(ARG_RECORD_VISITED_HOSTS)
                .help("Report which core hosts answered")
                .env("SESSIONKIT_RECORD_VISITED_HOSTS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Per request timeout in seconds")
                .env("SESSIONKIT_REQUEST_TIMEOUT")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
}
