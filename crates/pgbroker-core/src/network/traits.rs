// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Network rule manager trait definitions.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::command::CommandError;

/// Errors from forwarding rule operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NetworkError {
    /// The rule tool rejected the change.
    #[error("{operation} failed for {rule} (exit code {exit_code:?}): {stderr}")]
    RuleFailed {
        /// What was being attempted (e.g. "add").
        operation: &'static str,
        /// The rule involved.
        rule: ForwardingRule,
        /// Exit code, if any.
        exit_code: Option<i32>,
        /// Standard error of the call.
        stderr: String,
    },

    /// A rule tool call not tied to a single rule failed.
    #[error("{operation} failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        /// What was being attempted (e.g. "list DOCKER").
        operation: String,
        /// Exit code, if any.
        exit_code: Option<i32>,
        /// Standard error of the call.
        stderr: String,
    },

    /// The rule tool could not run to completion.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type for network rule operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// A NAT mapping from a host port to a workload's internal address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForwardingRule {
    /// Externally reachable host port.
    pub external_port: u16,
    /// Workload address on the runtime's internal network.
    pub internal_address: String,
    /// Service port inside the workload.
    pub internal_port: u16,
}

impl ForwardingRule {
    /// `address:port` destination of the rule.
    pub fn destination(&self) -> String {
        format!("{}:{}", self.internal_address, self.internal_port)
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{} -> {}", self.external_port, self.destination())
    }
}

/// Trait for installing and removing forwarding rules.
#[async_trait]
pub trait NetworkRuleManager: Send + Sync {
    /// Backend identifier (e.g. "iptables", "mock").
    fn backend(&self) -> &'static str;

    /// Install a rule redirecting `external_port` to the workload.
    async fn add_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()>;

    /// Remove a previously installed rule. A rule that is not installed
    /// counts as removed.
    async fn remove_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()>;

    /// Remove every rule forwarding `external_port`, whatever its
    /// destination. Returns how many rules were removed.
    async fn remove_forwarding_rules_for_port(&self, external_port: u16) -> Result<usize>;
}
