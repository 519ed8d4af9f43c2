//! Router assembly and serving

use crate::auth::{AuthConfig, Authenticator};
use crate::dashboard_endpoint::{dashboard_handler, public_dashboard_handler};
use crate::error::ServerResult;
use crate::health_endpoint::health_handler;
use crate::metrics_endpoint::metrics_handler;
use crate::middleware::{require_admin, track_requests};
use crate::monitor_endpoint::monitor_routes;
use crate::probes::{CacheRoundTripProbe, DataSourceProbe};
use axum::{Router, middleware, routing::get};
use libris_monitor_core::{
    AggregateComputer, LibraryDataSource, MetricCollector, MetricsExporter, MonitoringConfig,
    SystemHealthReporter,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP server settings from the `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Reported in health snapshots, e.g. `production`
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Shared state of all monitoring handlers
pub struct AppState {
    pub reporter: SystemHealthReporter,
    pub exporter: MetricsExporter,
    pub collector: Arc<MetricCollector>,
    pub auth: Arc<Authenticator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire collector, computer, reporter, exporter and probes for `source`
    pub fn new(
        monitoring: &MonitoringConfig,
        auth: &AuthConfig,
        environment: &str,
        source: Arc<dyn LibraryDataSource>,
    ) -> ServerResult<Self> {
        let collector = Arc::new(MetricCollector::new(monitoring)?);
        let computer = Arc::new(AggregateComputer::new(
            source.clone(),
            collector.clone(),
            monitoring,
        ));

        let reporter = SystemHealthReporter::new(computer.clone(), monitoring)?
            .with_probe(Arc::new(DataSourceProbe::new(source)))
            .with_probe(Arc::new(CacheRoundTripProbe::new()))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_environment(environment);
        let exporter = MetricsExporter::new(computer)?;

        Ok(Self {
            reporter,
            exporter,
            collector,
            auth: Arc::new(Authenticator::new(auth)),
        })
    }
}

/// Build the monitoring router
///
/// Admin routes: `/api/analytics/monitor/...`, `/api/analytics/dashboard/`
/// and `/metrics`. Public routes: `/api/analytics/public-dashboard/` and
/// `/health`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = monitor_routes()
        .route("/api/analytics/dashboard/", get(dashboard_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_admin,
        ));

    let public = Router::new()
        .route(
            "/api/analytics/public-dashboard/",
            get(public_dashboard_handler),
        )
        .route("/health", get(health_handler));

    admin
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    state.collector.clone(),
                    track_requests,
                )),
        )
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Monitoring API listening on {}", addr);
    info!("Endpoints:");
    info!("  GET http://{}/api/analytics/monitor/system/ - Health snapshot", addr);
    info!("  GET http://{}/api/analytics/monitor/:model/ - Model report", addr);
    info!("  GET http://{}/api/analytics/monitor/daily/  - Daily statistics", addr);
    info!("  GET http://{}/api/analytics/dashboard/      - HTML dashboard", addr);
    info!("  GET http://{}/api/analytics/public-dashboard/ - Public summary", addr);
    info!("  GET http://{}/metrics                       - Prometheus metrics", addr);
    info!("  GET http://{}/health                        - Liveness", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Monitoring API stopped");
    Ok(())
}

/// Bind `config.bind` and serve the monitoring router for `state`
pub async fn run<F>(config: &ServerConfig, state: Arc<AppState>, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&config.bind).await?;
    serve(listener, create_router(state), shutdown).await
}
