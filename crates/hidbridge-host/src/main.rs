//! hidbridge host service entry point.
//!
//! Wires the preset registry, the process supervisor, and the session
//! server together, then serves until a shutdown signal arrives. Shutdown
//! stops the accept loop and lets in-flight sessions finish their teardown
//! (automation process terminated, transport closed) before exiting.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hidbridge_host::application::session::SessionSettings;
use hidbridge_host::infrastructure::network::HostServer;
use hidbridge_host::infrastructure::presets::DirectoryPresetRegistry;
use hidbridge_host::infrastructure::process::CommandSupervisor;
use hidbridge_host::infrastructure::storage::config::load_config;

/// hidbridge host service: accepts one device agent, runs the automation
/// process for its preset, and streams pointer events back.
#[derive(Debug, Parser)]
#[command(name = "hidbridge-host", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "HIDBRIDGE_HOST_CONFIG", default_value = "hidbridge-host.toml")]
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

    info!("hidbridge host starting (config {})", args.config.display());

    let registry = Arc::new(DirectoryPresetRegistry::new(&config.automation.preset_dir));
    let supervisor = Arc::new(CommandSupervisor::new(
        &config.automation.executable,
        config.termination_grace(),
    ));
    let settings = SessionSettings {
        secret: config.service.secret.clone(),
        protocol_version: config.service.version.clone(),
    };

    let server = HostServer::bind(&config.listen_addr(), settings, registry, supervisor).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.serve(shutdown_rx).await;
    info!("hidbridge host stopped");
    Ok(())
}

/// Completes on ctrl-c, or on SIGTERM where the platform has one.
async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler, using ctrl-c only: {e}");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
