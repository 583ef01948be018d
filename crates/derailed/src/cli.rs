//! Command-line interface definitions and parsing.
//!
//! Built with the clap builder API. Global flags go before or after the
//! subcommand.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Override for the data directory
    pub data_dir: Option<PathBuf>,
    /// Override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Subcommand to run
    pub command: CliCommand,
}

/// The `derailed` subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Create the data directory and a fresh config
    Setup { api_url: String, gateway_url: String },
    /// Print the stored config
    Config,
    /// Create an account and store its token
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Open a gateway session and log events until interrupted
    Connect { events: Vec<String> },
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            data_dir: matches.get_one::<String>("data-dir").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            command: CliCommand::from_matches(matches),
        }
    }
}

impl CliCommand {
    fn from_matches(matches: &ArgMatches) -> Self {
        let value = |sub: &ArgMatches, name: &str| {
            sub.get_one::<String>(name).cloned().unwrap_or_default()
        };

        match matches.subcommand() {
            Some(("setup", sub)) => CliCommand::Setup {
                api_url: value(sub, "api-url"),
                gateway_url: value(sub, "gateway-url"),
            },
            Some(("register", sub)) => CliCommand::Register {
                username: value(sub, "username"),
                email: value(sub, "email"),
                password: value(sub, "password"),
            },
            Some(("logout", _)) => CliCommand::Logout,
            Some(("connect", sub)) => CliCommand::Connect {
                events: sub
                    .get_many::<String>("event")
                    .map(|names| names.cloned().collect())
                    .unwrap_or_default(),
            },
            // `subcommand_required` leaves `config` as the only other case
            _ => CliCommand::Config,
        }
    }
}

/// The full `derailed` command definition.
pub fn command() -> Command {
    Command::new("derailed")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Command line client for Derailed")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .global(true)
                .help("Data directory (defaults to the platform data directory)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("setup")
                .about("Create the data directory and configuration file")
                .arg(Arg::new("api-url").value_name("API_URL").required(true))
                .arg(Arg::new("gateway-url").value_name("GATEWAY_URL").required(true)),
        )
        .subcommand(
            Command::new("config")
                .alias("_cfg_drop")
                .about("Print the stored configuration"),
        )
        .subcommand(
            Command::new("register")
                .about("Register a new account")
                .arg(Arg::new("username").value_name("USERNAME").required(true))
                .arg(Arg::new("email").value_name("EMAIL").required(true))
                .arg(Arg::new("password").value_name("PASSWORD").required(true)),
        )
        .subcommand(Command::new("logout").about("Forget the stored token"))
        .subcommand(
            Command::new("connect")
                .about("Connect to the gateway and log events until interrupted")
                .arg(
                    Arg::new("event")
                        .short('e')
                        .long("event")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Dispatch event to log, may be repeated"),
                ),
        )
}
