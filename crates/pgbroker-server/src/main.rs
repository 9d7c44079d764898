// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! pgbroker - PostgreSQL Service Broker
//!
//! An HTTP(S) server responsible for:
//! - Advertising the service catalog
//! - Provisioning instances (container, forwarding rule, registry record)
//! - Deprovisioning instances

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use pgbroker_core::network::{IptablesRules, NetworkRuleManager};
use pgbroker_core::runtime::{DockerRuntime, WorkloadRuntime};
use pgbroker_core::{Orchestrator, OrchestratorConfig, RegistryStore};
use pgbroker_server::{AppState, Config, build_router, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pgbroker_server=info,pgbroker_core=info,tower_http=info".into()
            }),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        tls = config.tls.is_some(),
        require_forwarding_rule = config.require_forwarding_rule,
        "Starting pgbroker"
    );

    // Registry
    let registry = RegistryStore::connect(&config.database_url)
        .await
        .context("failed to open registry database")?;
    registry
        .create_schema_if_missing()
        .await
        .context("failed to create registry schema")?;

    let live = registry.list().await?;
    info!(instances = live.len(), "Registry ready");

    // Collaborators
    let runtime = Arc::new(DockerRuntime::from_env());
    info!(runtime_type = runtime.runtime_type(), "Runtime initialized");

    let network = Arc::new(IptablesRules::from_env());
    info!(backend = network.backend(), "Forwarding rules initialized");

    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        runtime,
        network,
        OrchestratorConfig {
            require_forwarding_rule: config.require_forwarding_rule,
            ..OrchestratorConfig::default()
        },
    ));

    let router = build_router(Arc::new(AppState::new(orchestrator)));

    match &config.tls {
        Some(paths) => {
            let server_config = tls::load_server_config(&paths.cert_path, &paths.key_path)
                .context("failed to load TLS certificate")?;
            let rustls_config =
                axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(server_config));

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!(addr = %config.http_addr, "pgbroker ready (HTTPS)");

            axum_server::bind_rustls(config.http_addr, rustls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .context("HTTPS server error")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.http_addr)
                .await
                .context("failed to bind TCP listener")?;

            info!(addr = %config.http_addr, "pgbroker ready (HTTP)");

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server error")?;
        }
    }

    info!("pgbroker shut down");

    Ok(())
}

/// Wait for Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
