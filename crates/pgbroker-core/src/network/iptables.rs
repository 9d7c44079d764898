// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! iptables DNAT rules.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::command::{env_or, env_secs, run_command};
use crate::network::{ForwardingRule, NetworkError, NetworkRuleManager, Result};

/// iptables configuration.
#[derive(Debug, Clone)]
pub struct IptablesConfig {
    /// Path or name of the iptables binary.
    pub iptables_bin: String,
    /// Table holding the rules.
    pub table: String,
    /// Chain holding the rules.
    pub chain: String,
    /// Upper bound on a single iptables call.
    pub command_timeout: Duration,
}

impl Default for IptablesConfig {
    fn default() -> Self {
        Self {
            iptables_bin: "iptables".to_string(),
            table: "nat".to_string(),
            chain: "DOCKER".to_string(),
            command_timeout: Duration::from_secs(300),
        }
    }
}

impl IptablesConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            iptables_bin: env_or("PGBROKER_IPTABLES_BIN", &defaults.iptables_bin),
            table: defaults.table,
            chain: env_or("PGBROKER_IPTABLES_CHAIN", &defaults.chain),
            command_timeout: env_secs("PGBROKER_COMMAND_TIMEOUT_SECS", defaults.command_timeout),
        }
    }
}

/// Forwarding rules managed through the iptables CLI.
pub struct IptablesRules {
    config: IptablesConfig,
}

impl IptablesRules {
    /// Create a new iptables rule manager.
    pub fn new(config: IptablesConfig) -> Self {
        Self { config }
    }

    /// Create a rule manager configured from environment variables.
    pub fn from_env() -> Self {
        Self::new(IptablesConfig::from_env())
    }

    /// Arguments for appending (`-A`) or deleting (`-D`) `rule`.
    pub fn rule_args(&self, action: &str, rule: &ForwardingRule) -> Vec<String> {
        vec![
            "-t".to_string(),
            self.config.table.clone(),
            action.to_string(),
            self.config.chain.clone(),
            "-p".to_string(),
            "tcp".to_string(),
            "--dport".to_string(),
            rule.external_port.to_string(),
            "-j".to_string(),
            "DNAT".to_string(),
            "--to-destination".to_string(),
            rule.destination(),
        ]
    }
}

/// Rule specs from an `iptables -S <chain>` listing that forward `port`,
/// rewritten for deletion.
///
/// Only DNAT rules without an inbound interface match are selected, which
/// leaves Docker's own published-port rules alone.
pub fn port_rule_specs(listing: &str, chain: &str, port: u16) -> Vec<Vec<String>> {
    let port = port.to_string();
    listing
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["-A", c, rest @ ..] if *c == chain => Some(rest.to_vec()),
                _ => None,
            }
        })
        .filter(|rest| {
            let forwards_port = rest.windows(2).any(|w| w[0] == "--dport" && w[1] == port);
            let is_dnat = rest.windows(2).any(|w| w[0] == "-j" && w[1] == "DNAT");
            let has_interface = rest.iter().any(|t| *t == "-i");
            forwards_port && is_dnat && !has_interface
        })
        .map(|rest| {
            let mut spec = vec!["-D".to_string(), chain.to_string()];
            spec.extend(rest.into_iter().map(str::to_string));
            spec
        })
        .collect()
}

/// Whether iptables' stderr says the rule to delete is not installed.
fn is_missing_rule(stderr: &str) -> bool {
    stderr.contains("does a matching rule exist") || stderr.contains("Bad rule")
}

#[async_trait]
impl NetworkRuleManager for IptablesRules {
    fn backend(&self) -> &'static str {
        "iptables"
    }

    async fn add_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()> {
        let output = run_command(
            &self.config.iptables_bin,
            &self.rule_args("-A", rule),
            self.config.command_timeout,
        )
        .await?;

        if !output.success {
            return Err(NetworkError::RuleFailed {
                operation: "add",
                rule: rule.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        info!(rule = %rule, chain = %self.config.chain, "Installed forwarding rule");
        Ok(())
    }

    async fn remove_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()> {
        let output = run_command(
            &self.config.iptables_bin,
            &self.rule_args("-D", rule),
            self.config.command_timeout,
        )
        .await?;

        if !output.success {
            if is_missing_rule(&output.stderr) {
                debug!(rule = %rule, "Forwarding rule already absent");
                return Ok(());
            }
            return Err(NetworkError::RuleFailed {
                operation: "remove",
                rule: rule.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        info!(rule = %rule, chain = %self.config.chain, "Removed forwarding rule");
        Ok(())
    }

    async fn remove_forwarding_rules_for_port(&self, external_port: u16) -> Result<usize> {
        let list_args = vec![
            "-t".to_string(),
            self.config.table.clone(),
            "-S".to_string(),
            self.config.chain.clone(),
        ];
        let listing = run_command(
            &self.config.iptables_bin,
            &list_args,
            self.config.command_timeout,
        )
        .await?;

        if !listing.success {
            return Err(NetworkError::CommandFailed {
                operation: format!("list {}", self.config.chain),
                exit_code: listing.exit_code,
                stderr: listing.stderr.trim().to_string(),
            });
        }

        let mut removed = 0;
        for spec in port_rule_specs(&listing.stdout, &self.config.chain, external_port) {
            let mut args = vec!["-t".to_string(), self.config.table.clone()];
            args.extend(spec);

            let output =
                run_command(&self.config.iptables_bin, &args, self.config.command_timeout).await?;
            if output.success {
                removed += 1;
            } else if !is_missing_rule(&output.stderr) {
                return Err(NetworkError::CommandFailed {
                    operation: format!("remove rule for port {}", external_port),
                    exit_code: output.exit_code,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        }

        if removed > 0 {
            info!(
                port = external_port,
                removed,
                chain = %self.config.chain,
                "Removed port forwarding rules"
            );
        }
        Ok(removed)
    }
}
