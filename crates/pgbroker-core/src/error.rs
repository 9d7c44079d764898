// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for pgbroker-core.

use thiserror::Error;

/// Lifecycle errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A record with this instance id is already registered.
    #[error("Instance '{instance_id}' already exists")]
    AlreadyExists {
        /// The duplicate instance id.
        instance_id: String,
    },

    /// The port is already recorded for another instance.
    #[error("Port {port} is already allocated")]
    PortTaken {
        /// The duplicate port.
        port: u16,
    },

    /// Every port above the current maximum is in use.
    #[error("No ports left to allocate (current maximum {max})")]
    PortsExhausted {
        /// Highest port currently recorded.
        max: u16,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Workload runtime operation failed.
    #[error("Runtime error: {0}")]
    Runtime(#[from] crate::runtime::RuntimeError),

    /// Forwarding rule operation failed.
    #[error("Network rule error: {0}")]
    Network(#[from] crate::network::NetworkError),
}

impl Error {
    /// Short machine-readable code, used as a structured logging field.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "INSTANCE_ALREADY_EXISTS",
            Self::PortTaken { .. } => "PORT_TAKEN",
            Self::PortsExhausted { .. } => "PORTS_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Runtime(_) => "RUNTIME_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
        }
    }

    /// Whether the error means the request collided with an existing instance.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::PortTaken { .. })
    }
}

/// Result type using the core Error.
pub type Result<T> = std::result::Result<T, Error>;
