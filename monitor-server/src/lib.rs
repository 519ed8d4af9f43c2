//! HTTP surface of the library monitoring system
//!
//! This crate exposes the monitoring core over axum:
//! - Admin-only health snapshots, per-model reports and daily statistics
//! - A Prometheus scrape endpoint
//! - A public dashboard summary and an admin HTML dashboard
//! - A liveness endpoint
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use libris_monitor_core::{InMemoryLibrary, MonitoringConfig};
//! use libris_monitor_server::{AppState, AuthConfig, ServerConfig, run};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = Arc::new(InMemoryLibrary::from_json_file("library.json").await?);
//!     let state = AppState::new(
//!         &MonitoringConfig::default(),
//!         &AuthConfig::default(),
//!         "development",
//!         library,
//!     )?;
//!
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     run(&ServerConfig::default(), Arc::new(state), shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod dashboard_endpoint;
pub mod error;
pub mod health_endpoint;
pub mod metrics_endpoint;
pub mod middleware;
pub mod monitor_endpoint;
pub mod probes;
pub mod server;

pub use auth::{ApiKeyEntry, AuthConfig, AuthContext, Authenticator, JwtClaims, TokenValidator};
pub use error::{ServerError, ServerResult};
pub use probes::{CacheRoundTripProbe, DataSourceProbe};
pub use server::{AppState, ServerConfig, create_router, run, serve};

#[cfg(test)]
mod server_tests;
