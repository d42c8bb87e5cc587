//! TCP listener for the host service.
//!
//! Accepts inbound connections and hands each one to its own
//! [`Session`] task. On shutdown the listener stops accepting and waits for
//! in-flight sessions to finish their teardown (process terminated,
//! transport closed) instead of aborting them.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::application::session::{
    PresetRegistry, ProcessSupervisor, Session, SessionSettings,
};

/// Errors that keep the server from coming up.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen socket could not be bound.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// The host-side session server.
pub struct HostServer {
    listener: TcpListener,
    settings: SessionSettings,
    registry: Arc<dyn PresetRegistry>,
    supervisor: Arc<dyn ProcessSupervisor>,
}

impl HostServer {
    /// Binds the listen socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address is unavailable.
    pub async fn bind(
        addr: &str,
        settings: SessionSettings,
        registry: Arc<dyn PresetRegistry>,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self {
            listener,
            settings,
            registry,
            supervisor,
        })
    }

    /// Address the server is actually listening on (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Accepts connections until the shutdown signal flips, then drains
    /// in-flight sessions.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        if let Some(addr) = self.local_addr() {
            info!("listening on {addr}");
        }
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("connection accepted from {peer}");
                        let session = Session::new(
                            self.settings.clone(),
                            Arc::clone(&self.registry),
                            Arc::clone(&self.supervisor),
                        );
                        let session_shutdown = shutdown.clone();
                        sessions.spawn(async move {
                            match session.run(stream, session_shutdown).await {
                                Ok(summary) => info!(
                                    "session from {peer} closed after {} event(s)",
                                    summary.events_streamed
                                ),
                                // Rejections stay silent on the wire; the
                                // reason lives in the host log only.
                                Err(e) => warn!("session from {peer} ended: {e}"),
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
                _ = shutdown.changed() => break,
            }

            // Reap whatever already finished so the set stays small.
            while sessions.try_join_next().is_some() {}
        }

        info!("shutdown requested; waiting for in-flight sessions");
        while sessions.join_next().await.is_some() {}
        info!("all sessions closed");
    }
}
