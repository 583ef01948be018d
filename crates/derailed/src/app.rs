//! Command execution.
//!
//! The `Application` owns the resolved data directory and runs exactly one
//! subcommand. User-facing output goes to stderr, diagnostics go through
//! `tracing`.

use crate::api::{ApiClient, RegisterRequest};
use crate::cli::{CliArgs, CliCommand};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::paths::DataPaths;
use crate::signals::wait_for_shutdown_signal;
use derailed_events::Ready;
use derailed_gateway::{ConnectionState, Gateway, GatewayError, SessionEnd};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// How long `connect` waits for the server to answer a Close on shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A single CLI invocation.
#[derive(Debug)]
pub struct Application {
    command: CliCommand,
    paths: DataPaths,
}

impl Application {
    /// Resolves the data directory for `args`.
    pub fn new(args: CliArgs) -> Result<Self, AppError> {
        let paths = DataPaths::resolve(args.data_dir)?;
        Ok(Self::with_paths(args.command, paths))
    }

    pub fn with_paths(command: CliCommand, paths: DataPaths) -> Self {
        Self { command, paths }
    }

    /// Runs the command.
    pub async fn run(self) -> Result<(), AppError> {
        match &self.command {
            CliCommand::Setup { api_url, gateway_url } => self.setup(api_url, gateway_url).await,
            CliCommand::Config => self.show_config().await,
            CliCommand::Register {
                username,
                email,
                password,
            } => {
                let request = RegisterRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                };
                self.register(&request).await
            }
            CliCommand::Logout => self.logout().await,
            CliCommand::Connect { events } => self.connect(events).await.map(|_| ()),
        }
    }

    async fn setup(&self, api_url: &str, gateway_url: &str) -> Result<(), AppError> {
        let config = AppConfig::new(api_url, gateway_url);
        config.validate().map_err(AppError::InvalidConfig)?;

        self.paths.create().await?;
        eprintln!("Finished setup of directories");

        config.save(&self.paths).await?;
        eprintln!("Finished setup of configuration file");
        Ok(())
    }

    async fn show_config(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.paths).await?;
        eprintln!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), AppError> {
        let mut config = AppConfig::load(&self.paths).await?;
        if config.token.is_some() {
            return Err(AppError::AlreadyLoggedIn);
        }

        let client = ApiClient::new(&config.urls.api, config.proxy.as_ref())?;
        let response = client.register(request).await?;

        config.token = Some(response.token);
        config.save(&self.paths).await?;

        eprintln!("Welcome to Derailed {}!", response.username);
        Ok(())
    }

    async fn logout(&self) -> Result<(), AppError> {
        let mut config = AppConfig::load(&self.paths).await?;
        if config.token.take().is_none() {
            eprintln!("Not logged in");
            return Ok(());
        }

        config.save(&self.paths).await?;
        eprintln!("Logged out");
        Ok(())
    }

    /// Runs a gateway session until it ends or a shutdown signal arrives.
    ///
    /// Returns `None` when the server did not finish the close handshake in
    /// time.
    async fn connect(&self, event_names: &[String]) -> Result<Option<SessionEnd>, AppError> {
        let config = AppConfig::load(&self.paths).await?;
        config.validate().map_err(AppError::InvalidConfig)?;
        let token = config.token.clone().ok_or(AppError::NotLoggedIn)?;

        let gateway = Gateway::new(config.gateway_config());

        gateway
            .events()
            .on(|ready: Ready| async move {
                info!("✅ Gateway ready: {}", ready.payload);
                Ok(())
            })
            .await?;

        for name in event_names {
            let event_name = name.clone();
            gateway
                .events()
                .subscribe(name, move |payload| {
                    info!("📨 {}: {}", event_name, payload);
                    std::future::ready(Ok(()))
                })
                .await?;
        }

        let mut faults = gateway.faults();
        let fault_logger = tokio::spawn(async move {
            loop {
                match faults.recv().await {
                    Ok(fault) => warn!("⚠️ Session fault: {}", fault),
                    Err(RecvError::Lagged(skipped)) => warn!("⚠️ Skipped {} session faults", skipped),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        gateway.connect(&token).await?;
        info!("🛑 Press Ctrl+C to disconnect");

        let end = tokio::select! {
            result = wait_for_shutdown_signal() => {
                result?;
                info!("🛑 Closing gateway session...");
                match gateway.close(CLOSE_TIMEOUT).await {
                    Ok(end) => Some(end),
                    // The session ended on its own while the signal arrived
                    Err(GatewayError::NotConnected) => Some(gateway.wait_until_closed().await?),
                    Err(GatewayError::CloseTimeout(_)) => None,
                    Err(e) => return Err(e.into()),
                }
            }
            result = gateway.wait_for_state(ConnectionState::Disconnected) => {
                result?;
                Some(gateway.wait_until_closed().await?)
            }
        };

        fault_logger.abort();

        if let Some(end) = &end {
            info!(
                "🔌 Session {} ended: {:?} after {} frames (last sequence {:?})",
                end.session_id, end.reason, end.frames_processed, end.last_sequence
            );
        }
        Ok(end)
    }
}
