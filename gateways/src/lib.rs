//! Control-plane gateways for the Fornax load-test harness
//!
//! This crate provides implementations of the `ResourceGateway` trait for:
//!
//! - The Fornax API server's REST API (`http`)
//! - An in-memory control plane (`simulated`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod http;
pub mod simulated;

pub use config::{GatewayConfig, GatewayKind, SimulatedConfig};
pub use http::HttpGateway;
pub use simulated::SimulatedGateway;

use fornax_loadtest_core::{GatewayError, ResourceGateway};
use std::sync::Arc;

/// Build the gateway selected by `config`
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn ResourceGateway>, GatewayError> {
    let gateway: Arc<dyn ResourceGateway> = match config.kind {
        GatewayKind::Http => Arc::new(HttpGateway::from_config(config)?),
        GatewayKind::Simulated => Arc::new(SimulatedGateway::new(config.simulated.clone())),
    };
    tracing::debug!(gateway = gateway.name(), "Gateway ready");
    Ok(gateway)
}
