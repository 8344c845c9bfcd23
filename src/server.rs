//! Reusable parking service runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! metrics recorder, in-memory stores, services, REST API, reservation
//! expiry and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    start_reservation_expiry_task, LotService, QueryService, ReservationManager,
};
use crate::config::AppConfig;
use crate::infrastructure::{GridGeoIndex, InMemoryLotStore, InMemoryReservationRepository};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::errors::DomainError;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to install Prometheus metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("Invalid service setup: {0}")]
    Setup(#[from] DomainError),

    #[error("Failed to bind API listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the parking service.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
}

// ── Services ───────────────────────────────────────────────────────

/// The wired-up core: stores, index and the services over them.
#[derive(Clone)]
pub struct Services {
    pub lots: Arc<LotService>,
    pub queries: Arc<QueryService>,
    pub reservations: Arc<ReservationManager>,
}

impl Services {
    /// Build in-memory stores and the services from configuration.
    pub fn build(config: &AppConfig) -> Result<Self, DomainError> {
        let lot_store = Arc::new(InMemoryLotStore::new(config.reservations.lock_timeout()));
        let index = Arc::new(GridGeoIndex::new(config.geo.cell_size_degrees)?);
        let reservation_repo = Arc::new(InMemoryReservationRepository::new());

        let mut manager = ReservationManager::new(lot_store.clone(), reservation_repo);
        if let Some(ttl) = config.reservations.hold_ttl() {
            manager = manager.with_hold_ttl(ttl);
        }

        Ok(Self {
            lots: Arc::new(LotService::new(lot_store.clone(), index.clone())),
            queries: Arc::new(QueryService::new(index, lot_store)),
            reservations: Arc::new(manager),
        })
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running parking service.
///
/// # Examples
///
/// ```rust,no_run
/// use parking_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Core services, for embedding callers.
    pub services: Services,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the API server is listening on.
    pub api_addr: SocketAddr,

    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    expiry_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the parking service with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus metrics recorder
    /// 2. Build stores, geo index and services
    /// 3. Start the reservation expiry task (when a hold TTL is set)
    /// 4. Start the REST API server (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let app_cfg = opts.config;

        info!("Starting parking service...");

        let prometheus_handle = prometheus_handle()?;
        info!("📊 Prometheus metrics recorder ready");

        // ── Services ───────────────────────────────────────────
        let services = Services::build(&app_cfg)?;
        info!(
            cell_size_degrees = app_cfg.geo.cell_size_degrees,
            lock_timeout_ms = app_cfg.reservations.lock_timeout_ms,
            "Core services initialized"
        );

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let expiry_task = match app_cfg.reservations.hold_ttl() {
            Some(ttl) => {
                info!(
                    ttl_secs = ttl.num_seconds(),
                    "Reservations expire after their hold time"
                );
                Some(start_reservation_expiry_task(
                    services.reservations.clone(),
                    shutdown_signal.clone(),
                    app_cfg.reservations.expiry_check_interval_secs,
                ))
            }
            None => None,
        };

        // ── REST API server ────────────────────────────────────
        let state = AppState::new(
            services.lots.clone(),
            services.queries.clone(),
            services.reservations.clone(),
            prometheus_handle,
        );
        let api_router = create_api_router(state);

        let address = app_cfg.api_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let api_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Parking service started.");

        Ok(Self {
            services,
            config: app_cfg,
            api_addr,
            shutdown,
            api_task,
            expiry_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to fully stop after shutdown has been triggered,
    /// bounded by `server.shutdown_timeout`.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let api_task = self.api_task;
        let expiry_task = self.expiry_task;
        let completed = self
            .shutdown
            .shutdown_with_cleanup(|| async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
                if let Some(task) = expiry_task {
                    if let Err(e) = task.await {
                        error!("Reservation expiry task panicked: {}", e);
                    }
                }
            })
            .await;

        if !completed {
            warn!("Server tasks did not stop in time");
        }
        info!("👋 Parking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down parking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global metrics recorder can only be installed once per process;
/// later starts reuse it.
fn prometheus_handle() -> Result<PrometheusHandle, ServerError> {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("📊 Prometheus metrics recorder installed");
    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, NewParkingLot};

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".to_string();
        config.server.api_port = 0;
        config.server.shutdown_timeout = 5;
        config
    }

    #[tokio::test]
    async fn services_share_one_lot_store() {
        let services = Services::build(&AppConfig::default()).unwrap();
        let lot = services
            .lots
            .create(NewParkingLot {
                name: "Mirzo Ulugbek".into(),
                address: None,
                coordinates: Coordinates {
                    latitude: 41.33,
                    longitude: 69.33,
                },
                total_spots: 1,
            })
            .await
            .unwrap();

        let hits = services
            .queries
            .search(lot.coordinates, 10.0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        assert!(services
            .reservations
            .reserve(lot.id, "alice")
            .await
            .unwrap()
            .is_granted());
        assert_eq!(services.lots.get(lot.id).await.unwrap().available_spots, 0);
    }

    #[tokio::test]
    async fn oversized_hold_is_clamped_and_reservations_still_work() {
        let mut config = AppConfig::default();
        config.reservations.hold_ttl_secs = Some(1_000_000_000_000_000);
        assert!(config.validate().is_err());

        let services = Services::build(&config).unwrap();
        let lot = services
            .lots
            .create(NewParkingLot {
                name: "Sergeli".into(),
                address: None,
                coordinates: Coordinates {
                    latitude: 41.22,
                    longitude: 69.22,
                },
                total_spots: 2,
            })
            .await
            .unwrap();

        let outcome = services.reservations.reserve(lot.id, "alice").await.unwrap();
        assert!(outcome.reservation().unwrap().expires_at.is_some());
        assert_eq!(services.lots.get(lot.id).await.unwrap().available_spots, 1);
    }

    #[test]
    fn invalid_cell_size_fails_setup() {
        let mut config = AppConfig::default();
        config.geo.cell_size_degrees = -1.0;
        assert!(Services::build(&config).is_err());
    }

    #[tokio::test]
    async fn start_and_shutdown() {
        let mut config = local_config();
        config.reservations.hold_ttl_secs = Some(60);

        let handle = ServerHandle::start(ServerOptions { config }).await.unwrap();
        assert!(handle.is_running());
        assert_ne!(handle.api_addr.port(), 0);

        let stream = tokio::net::TcpStream::connect(handle.api_addr).await;
        assert!(stream.is_ok());

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown())
            .await
            .unwrap();
    }
}
