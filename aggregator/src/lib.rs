//! Restaurant composition gateway.
//!
//! Serves a single restaurant resource assembled from a record service, an
//! image service and a rating service. Reads fan out to all three in parallel
//! and degrade missing images or ratings instead of failing.

pub mod api;
pub mod composer;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fault_injection;
pub mod metrics_defs;
pub mod service;
pub mod task_group;

#[cfg(test)]
mod testutils;

use crate::errors::{GatewayError, Result};
use crate::service::GatewayService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

/// Serves the gateway and its admin listener until either fails.
pub async fn run(config: config::Config) -> Result<()> {
    let gateway_service = GatewayService::from_config(&config)?;
    let admin_service: AdminService<_, GatewayError> = AdminService::new(|| true);

    let gateway_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        gateway_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(gateway_task, admin_task)?;
    Ok(())
}
