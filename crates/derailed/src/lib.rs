//! # Derailed CLI
//!
//! Command line client for the Derailed chat platform.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create the data directory and configuration
//! derailed setup https://api.derailed.example wss://gateway.derailed.example
//!
//! # Create an account; the token is stored in the configuration
//! derailed register bob bob@example.com hunter2
//!
//! # Open a gateway session and log message events until Ctrl+C
//! derailed connect --event MESSAGE_CREATE
//!
//! # Inspect or reset the stored state
//! derailed config
//! derailed logout
//! ```
//!
//! The configuration is a TOML file in the platform data directory, or in
//! the directory passed with `--data-dir`.

use tracing::debug;

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::{AppConfig, LoggingSettings};
use paths::DataPaths;

pub use error::AppError;

/// Entry point for the `derailed` binary.
///
/// Parses the command line, sets up logging from the stored configuration
/// (if any) and the CLI overrides, then runs the requested command. Exits the
/// process with status 1 when the command fails.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the stored config when there is one
    let mut logging = match DataPaths::resolve(args.data_dir.clone()) {
        Ok(paths) => AppConfig::load(&paths)
            .await
            .map(|config| config.logging)
            .unwrap_or_default(),
        Err(_) => LoggingSettings::default(),
    };
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    let result = match Application::new(args) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        debug!("Command failed: {:?}", e);
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}
