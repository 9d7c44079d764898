// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock rule manager for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::traits::*;

/// In-memory forwarding rule table.
#[derive(Default)]
pub struct MockNetworkRules {
    rules: Mutex<HashSet<ForwardingRule>>,
    /// If true, `add_forwarding_rule` fails.
    pub fail_add: bool,
    /// If true, rule removals fail.
    pub fail_remove: bool,
}

impl MockNetworkRules {
    /// Create an empty rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule table that rejects every new rule.
    pub fn failing() -> Self {
        Self {
            fail_add: true,
            ..Self::default()
        }
    }

    /// Whether any installed rule forwards `external_port`.
    pub async fn has_rule_for_port(&self, external_port: u16) -> bool {
        self.rules
            .lock()
            .await
            .iter()
            .any(|r| r.external_port == external_port)
    }

    /// Snapshot of installed rules.
    pub async fn rules(&self) -> Vec<ForwardingRule> {
        self.rules.lock().await.iter().cloned().collect()
    }
}

fn mock_failure(operation: &'static str, rule: &ForwardingRule) -> NetworkError {
    NetworkError::RuleFailed {
        operation,
        rule: rule.clone(),
        exit_code: Some(1),
        stderr: "Mock failure".to_string(),
    }
}

#[async_trait]
impl NetworkRuleManager for MockNetworkRules {
    fn backend(&self) -> &'static str {
        "mock"
    }

    async fn add_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()> {
        if self.fail_add {
            return Err(mock_failure("add", rule));
        }
        self.rules.lock().await.insert(rule.clone());
        Ok(())
    }

    async fn remove_forwarding_rule(&self, rule: &ForwardingRule) -> Result<()> {
        if self.fail_remove {
            return Err(mock_failure("remove", rule));
        }
        self.rules.lock().await.remove(rule);
        Ok(())
    }

    async fn remove_forwarding_rules_for_port(&self, external_port: u16) -> Result<usize> {
        if self.fail_remove {
            return Err(NetworkError::CommandFailed {
                operation: format!("remove rules for port {}", external_port),
                exit_code: Some(1),
                stderr: "Mock failure".to_string(),
            });
        }
        let mut rules = self.rules.lock().await;
        let before = rules.len();
        rules.retain(|r| r.external_port != external_port);
        Ok(before - rules.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(external_port: u16, internal_address: &str) -> ForwardingRule {
        ForwardingRule {
            external_port,
            internal_address: internal_address.to_string(),
            internal_port: 5432,
        }
    }

    #[tokio::test]
    async fn test_remove_rules_for_port() {
        let rules = MockNetworkRules::new();
        rules.add_forwarding_rule(&rule(5432, "172.17.0.2")).await.unwrap();
        rules.add_forwarding_rule(&rule(5432, "172.17.0.3")).await.unwrap();
        rules.add_forwarding_rule(&rule(5433, "172.17.0.4")).await.unwrap();

        assert_eq!(rules.remove_forwarding_rules_for_port(5432).await.unwrap(), 2);
        assert_eq!(rules.rules().await, vec![rule(5433, "172.17.0.4")]);
        assert_eq!(rules.remove_forwarding_rules_for_port(5432).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_add() {
        let rules = MockNetworkRules::failing();
        assert!(rules.add_forwarding_rule(&rule(5432, "172.17.0.2")).await.is_err());
        assert!(!rules.has_rule_for_port(5432).await);
    }
}
