//! # SiteLedger Server
//!
//! Runs the portal: services, event handlers and the REST API in one
//! process.
//!
//! ```text
//! HTTP ──→ sl-08 gateway ──→ services ──→ record store / blob store
//!                               │
//!                               └──PortalEvent──→ bus ──→ notifications, metrics
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use portal_runtime::{shutdown_signal, spawn_event_handlers, PortalConfig, PortalContainer};
use portal_telemetry::{init_telemetry, TelemetryConfig};
use sl_08_api_gateway::ApiGatewayService;

/// How long handlers get to finish after the server stops.
const HANDLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The running portal.
struct PortalRuntime {
    container: Arc<PortalContainer>,
    shutdown_tx: watch::Sender<bool>,
    handlers: Vec<JoinHandle<()>>,
}

impl PortalRuntime {
    /// Open storage, build services and create the first admin.
    fn new(config: PortalConfig) -> Result<Self> {
        let container =
            PortalContainer::open(config).context("Failed to initialize portal storage")?;

        match container.bootstrap_admin() {
            Ok(Some(admin)) => info!(email = %admin.email, "Created first admin account"),
            Ok(None) if container.config.admin.is_none() => {
                warn!("SL_ADMIN_EMAIL not set; no admin account will be bootstrapped")
            }
            Ok(None) => info!("Admin account already present"),
            Err(e) => return Err(e).context("Failed to bootstrap admin account"),
        }

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            container: Arc::new(container),
            shutdown_tx,
            handlers: Vec::new(),
        })
    }

    /// Start event handlers, then serve HTTP until a shutdown signal.
    async fn run(mut self) -> Result<()> {
        info!("===========================================");
        info!("  SiteLedger Portal v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.handlers = spawn_event_handlers(&self.container, &self.shutdown_tx.subscribe());

        let gateway = ApiGatewayService::new(
            self.container.config.gateway_config(),
            self.container.app_state(),
        )
        .context("Invalid gateway configuration")?;
        info!(
            addr = %gateway.config().http_addr(),
            data_dir = %self.container.config.storage.data_dir.display(),
            backend = ?self.container.config.storage.backend,
            "Portal ready"
        );

        let served = gateway.serve(shutdown_signal()).await;
        self.shutdown().await;
        served.context("HTTP server failed")
    }

    /// Stop handlers and wait for them to drain.
    async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for handle in self.handlers {
            match tokio::time::timeout(HANDLER_DRAIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Event handler panicked"),
                Err(_) => warn!("Event handler did not stop in time"),
            }
        }
        info!("Shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = PortalConfig::from_env().context("Invalid configuration")?;
    config
        .validate_for_production()
        .context("Refusing to start")?;
    if config.security.allow_insecure {
        warn!("SL_ALLOW_INSECURE is set; weak signing keys are accepted");
    }

    PortalRuntime::new(config)?.run().await
}
