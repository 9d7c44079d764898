// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for pgbroker-server.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default registry database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:pgbroker.db?mode=rwc";

/// Server configuration loaded from environment variables.
///
/// Runtime and rule-manager settings are read by
/// [`DockerRuntime::from_env`](pgbroker_core::runtime::DockerRuntime::from_env) and
/// [`IptablesRules::from_env`](pgbroker_core::network::IptablesRules::from_env).
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry database URL
    pub database_url: String,
    /// HTTP(S) listen address
    pub http_addr: SocketAddr,
    /// Certificate and key, when serving HTTPS
    pub tls: Option<TlsPaths>,
    /// Fail provisions whose forwarding rule cannot be installed
    pub require_forwarding_rule: bool,
}

/// PEM files for the HTTPS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    /// Certificate chain
    pub cert_path: PathBuf,
    /// Private key
    pub key_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("PGBROKER_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let port: u16 = std::env::var("PGBROKER_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let tls = match (
            std::env::var("PGBROKER_TLS_CERT").ok(),
            std::env::var("PGBROKER_TLS_KEY").ok(),
        ) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let require_forwarding_rule = std::env::var("PGBROKER_REQUIRE_FORWARDING_RULE")
            .map(|v| !(v == "false" || v == "0"))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            http_addr,
            tls,
            require_forwarding_rule,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// Only one of the TLS certificate and key was given.
    #[error("PGBROKER_TLS_CERT and PGBROKER_TLS_KEY must be set together")]
    IncompleteTls,
}
