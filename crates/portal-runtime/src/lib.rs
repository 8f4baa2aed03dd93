//! # Portal Runtime Library
//!
//! Exposes the runtime's building blocks for the binary and for end-to-end
//! tests. The entry point is `main.rs`.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and service construction
//! - `handlers/` - runtime-owned event bus subscribers
//! - `wiring/` - spawning subscribers under the shutdown signal
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `SL_*` variables
//! 2. Refuse the development JWT secret unless `SL_ALLOW_INSECURE=1`
//! 3. Lock the data directory and open storage
//! 4. Build services (identity first, it backs the member directory)
//! 5. Create the first admin on an empty store
//! 6. Start event handlers
//! 7. Serve HTTP until SIGINT/SIGTERM, then stop handlers

pub mod container;
pub mod handlers;
pub mod wiring;

pub use container::{ConfigError, ContainerError, PortalConfig, PortalContainer, StorageBackend};
pub use wiring::spawn_event_handlers;

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
