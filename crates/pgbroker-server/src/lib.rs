// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! pgbroker Server - Service Broker HTTP API
//!
//! Exposes the Service Broker API v2 subset used to create and destroy
//! on-demand PostgreSQL instances. Lifecycle work is delegated to
//! [`pgbroker_core::Orchestrator`].
//!
//! # Endpoints
//!
//! | Method | Path | Success | Failure |
//! |--------|------|---------|---------|
//! | GET | `/v2/catalog` | 200 catalog | 500 |
//! | PUT | `/v2/service_instances/{id}` | 201 `{dashboard_url, database}` | 400, 500 |
//! | DELETE | `/v2/service_instances/{id}?service_id=&plan_id=&accepts_incomplete=` | 200 `{id, status}` | 400, 410, 500 |
//! | GET | `/health` | 200 `{status, version, uptime_ms}` | |
//!
//! Error bodies are always `{}`.
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PGBROKER_DATABASE_URL` | `sqlite:pgbroker.db?mode=rwc` | Registry database |
//! | `PGBROKER_HTTP_PORT` | `8080` | Listen port |
//! | `PGBROKER_TLS_CERT` / `PGBROKER_TLS_KEY` | unset | PEM files; HTTPS when both are set |
//! | `PGBROKER_REQUIRE_FORWARDING_RULE` | `true` | Fail provisions without a forwarding rule |
//! | `PGBROKER_DOCKER_BIN` | `docker` | Docker CLI |
//! | `PGBROKER_POSTGRES_IMAGE` | `postgres` | Instance image |
//! | `PGBROKER_POSTGRES_USER` / `PGBROKER_POSTGRES_PASSWORD` | `postgres` / `mysecretpassword` | Instance credentials |
//! | `PGBROKER_LAUNCH_TIMEOUT_SECS` | `30` | Address discovery bound |
//! | `PGBROKER_COMMAND_TIMEOUT_SECS` | `300` | Per CLI call bound |
//! | `PGBROKER_IPTABLES_BIN` / `PGBROKER_IPTABLES_CHAIN` | `iptables` / `DOCKER` | Rule tool |

#![deny(missing_docs)]

/// Static service catalog.
pub mod catalog;

/// Configuration loaded from environment variables.
pub mod config;

/// HTTP error mapping.
pub mod error;

/// Request handlers.
pub mod handlers;

/// Route table.
pub mod router;

/// HTTPS configuration and key policy.
pub mod tls;

/// Request validation.
pub mod validation;

pub use config::Config;
pub use error::ApiError;
pub use handlers::AppState;
pub use router::build_router;
