//! Dashboard server implementation.

use crate::error::DashboardError;
use crate::routes;
use crate::state::AppState;
use promptc_core::DashboardConfig;
use std::time::Duration;
use tokio::net::TcpListener;

/// The dashboard server.
pub struct DashboardServer {
    config: DashboardConfig,
    state: AppState,
}

impl DashboardServer {
    /// Create a new dashboard server with the given configuration.
    pub fn new(config: DashboardConfig, state: AppState) -> Self {
        let state = state.with_ping_interval(Duration::from_secs(config.ping_interval_secs));
        Self { config, state }
    }

    /// Bind the configured address.
    ///
    /// Split from [`serve`](Self::serve) so a busy port can be reported
    /// before anything is spawned.
    pub async fn bind(&self) -> Result<TcpListener, DashboardError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| DashboardError::StartupFailed { addr, source })
    }

    /// Serve on an already bound listener until the process exits.
    pub async fn serve(self, listener: TcpListener) -> Result<(), DashboardError> {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.config.bind_addr());
        tracing::info!(address = %addr, "Starting promptc dashboard");

        let app = routes::create_router(self.state);
        axum::serve(listener, app)
            .await
            .map_err(|source| DashboardError::StartupFailed { addr, source })
    }
}
