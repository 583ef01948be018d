//! Errors returned by CLI commands.

use derailed_events::EventError;
use derailed_gateway::GatewayError;

/// Failure of a `derailed` command.
///
/// The `Display` text is what the user sees before the process exits.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The data directory or its config file does not exist
    #[error("Directories not setup, please run `derailed setup` to setup")]
    NotSetUp,

    /// No `--data-dir` was given and the platform has no data directory
    #[error("Could not determine a data directory for this platform, pass --data-dir")]
    NoDataDir,

    /// `register` while a token is already stored
    #[error("Already logged in, please run `derailed logout` to register a new user")]
    AlreadyLoggedIn,

    /// A command that needs a token ran without one
    #[error("Not logged in, please run `derailed register` first")]
    NotLoggedIn,

    /// The API rejected the registration request
    #[error("Invalid registration information: {0}")]
    Registration(String),

    /// The stored configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Event subscription failed: {0}")]
    Event(#[from] EventError),
}
