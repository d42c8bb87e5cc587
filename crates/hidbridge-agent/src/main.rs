//! hidbridge device agent entry point.
//!
//! Wires the actuator, the shared UI state, and the reconnection controller
//! together, then runs until ctrl-c. The on-device menu UI (external to
//! this crate) reads link status from — and writes preset selections into —
//! the shared [`AgentAppState`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hidbridge_agent::application::reconnect::{LinkIdentity, ReconnectController};
use hidbridge_agent::infrastructure::actuator::select_actuator;
use hidbridge_agent::infrastructure::network::TcpSessionRunner;
use hidbridge_agent::infrastructure::storage::config::load_config;
use hidbridge_agent::infrastructure::ui_bridge::AgentAppState;

/// hidbridge device agent: connects to the host service and forwards
/// streamed pointer events to the local HID gadget.
#[derive(Debug, Parser)]
#[command(name = "hidbridge-agent", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "HIDBRIDGE_AGENT_CONFIG", default_value = "hidbridge-agent.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone())),
        )
        .init();

    info!("hidbridge agent starting (config {})", args.config.display());

    let state = AgentAppState::new();
    if let Some(preset) = config.preset.clone() {
        info!("preselecting preset '{}'", preset.name);
        state.select_preset(preset).await;
    }

    // Capability probe happens once, here; everything downstream sees only
    // the PointerActuator trait.
    let actuator = select_actuator(&config.actuator.device);

    let runner = Arc::new(TcpSessionRunner::new(
        &config.link.host,
        config.link.port,
        actuator,
        Arc::clone(&state),
    ));
    let controller = ReconnectController::new(
        LinkIdentity {
            protocol_version: config.service.version.clone(),
            secret: config.service.secret.clone(),
        },
        &config.link.reconnect_backoff_secs,
        Arc::clone(&state),
        runner,
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    controller.run(shutdown_rx).await;
    info!("hidbridge agent stopped");
    Ok(())
}
