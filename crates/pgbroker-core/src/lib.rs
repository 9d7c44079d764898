// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! pgbroker Core - Service Instance Lifecycle
//!
//! This crate provides the lifecycle machinery behind the pgbroker service
//! broker: a SQLite instance registry, monotonic port allocation, a workload
//! runtime that launches PostgreSQL containers, and NAT forwarding rules
//! that expose them on host ports.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 pgbroker-server (HTTP API)                   │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │   reserve port -> start workload -> add rule -> register     │
//! └──────────────────────────────────────────────────────────────┘
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//! ┌──────────────┐   ┌────────────────────┐   ┌────────────────────┐
//! │   Registry   │   │  WorkloadRuntime   │   │ NetworkRuleManager │
//! │   (SQLite)   │   │  (docker / mock)   │   │ (iptables / mock)  │
//! └──────────────┘   └────────────────────┘   └────────────────────┘
//! ```
//!
//! # Instance Lifecycle
//!
//! ```text
//! absent ──► launching ──► rule-installed ──► registered
//!   ▲            │               │                 │
//!   └────────────┴───────────────┘                 │
//!        (compensation on failure)                 ▼
//!   ▲                                        tearing-down
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! A registry record exists only while its workload is believed running.
//!
//! # Runtime Types
//!
//! | Runtime | Description |
//! |---------|-------------|
//! | Docker (default) | `docker run` of the PostgreSQL image, address from `docker inspect` |
//! | Mock | In-memory workloads for testing |

#![deny(missing_docs)]

/// Helpers for bounded external command execution.
pub mod command;

/// Error types for lifecycle operations.
pub mod error;

/// Forwarding rules from host ports to workloads.
pub mod network;

/// Provision and deprovision flows.
pub mod orchestrator;

/// Port allocation.
pub mod ports;

/// SQLite-backed instance registry.
pub mod registry;

/// Workload runtime abstraction (docker, mock).
pub mod runtime;

/// Records and requests.
pub mod types;

pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use registry::RegistryStore;
pub use types::{DeprovisionOutcome, DeprovisionRequest, ProvisionRequest, ServiceInstance};
