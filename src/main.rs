use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pulsekeep::api::{ApiServer, ApiServerConfig, AppState};
use pulsekeep::config::Config;
use pulsekeep::monitor::MonitoringLoop;
use pulsekeep::notification::NotificationDispatcher;
use pulsekeep::registry::ServiceRegistry;
use pulsekeep::logging;
use pulsekeep::util::read_secret_file;

/// Heartbeat monitor: tracks service pulses and notifies when one goes
/// silent.
#[derive(Debug, Parser)]
#[command(name = "pulsekeep", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml", env = "PULSEKEEP_CONFIG")]
    config: String,

    /// Address to bind the API server to
    #[arg(long, default_value = "0.0.0.0", env = "PULSEKEEP_BIND")]
    bind: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 8080, env = "PULSEKEEP_PORT")]
    port: u16,

    /// File containing the bearer token for the API; omit to serve openly
    #[arg(long, env = "PULSEKEEP_TOKEN_FILE")]
    token_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init()?;

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;

    let dispatcher = Arc::new(NotificationDispatcher::from_config(&config.notification));
    config
        .validate_channel_references(&dispatcher)
        .context("invalid notifier configuration")?;

    let registry = Arc::new(ServiceRegistry::new(
        config.service_specs(),
        config.timings.success_report_cooldown(),
    )?);
    info!(services = registry.len(), "service registry initialized");

    let auth_token = match &args.token_file {
        Some(path) => Some(
            read_secret_file(path)
                .with_context(|| format!("failed to read token file {path}"))?,
        ),
        None => {
            warn!("no token file configured, the API is unauthenticated");
            None
        }
    };

    let monitor = Arc::new(MonitoringLoop::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        config.timings.poll_interval(),
    ));
    monitor.start();

    let server = ApiServer::new(
        ApiServerConfig {
            bind_address: args.bind,
            port: args.port,
        },
        AppState::new(Arc::clone(&registry), auth_token),
    );

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel_token.cancel();
        }
    });

    server.run().await?;

    monitor.stop();
    info!("pulsekeep stopped");
    Ok(())
}
