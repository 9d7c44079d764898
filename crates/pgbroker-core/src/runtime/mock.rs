// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock runtime for testing.
//!
//! Simulates workloads in memory without touching docker.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::*;

/// Mock runtime for testing.
pub struct MockRuntime {
    workloads: Mutex<HashMap<String, String>>,
    next_host: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    /// If true, `start` fails with a launch error.
    pub fail_start: bool,
    /// If true, `start` launches but never reports an address.
    pub never_addressed: bool,
    /// If true, `stop` fails.
    pub fail_stop: bool,
    /// Simulated launch latency.
    pub start_delay: Duration,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Create a mock runtime whose workloads start successfully.
    pub fn new() -> Self {
        Self {
            workloads: Mutex::new(HashMap::new()),
            next_host: AtomicUsize::new(2),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_start: false,
            never_addressed: false,
            fail_stop: false,
            start_delay: Duration::ZERO,
        }
    }

    /// Create a mock runtime that refuses to launch workloads.
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    /// Create a mock runtime whose workloads never report an address.
    pub fn never_addressed() -> Self {
        Self {
            never_addressed: true,
            ..Self::new()
        }
    }

    /// Create a mock runtime whose `stop` always fails.
    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::new()
        }
    }

    /// Delay every `start` by `delay`.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Whether a workload for `instance_id` is running.
    pub async fn is_running(&self, instance_id: &str) -> bool {
        self.workloads.lock().await.contains_key(instance_id)
    }

    /// Number of running workloads.
    pub async fn running_count(&self) -> usize {
        self.workloads.lock().await.len()
    }

    /// Simulate a workload that exists outside the broker's control.
    pub async fn insert_workload(&self, instance_id: &str, address: &str) {
        self.workloads
            .lock()
            .await
            .insert(instance_id.to_string(), address.to_string());
    }

    /// Number of `start` calls so far.
    pub fn start_calls(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls so far.
    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkloadRuntime for MockRuntime {
    fn runtime_type(&self) -> &'static str {
        "mock"
    }

    async fn start(&self, instance_id: &str) -> Result<WorkloadHandle> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let started_at = Utc::now();

        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }

        if self.fail_start {
            return Err(RuntimeError::LaunchFailed {
                instance_id: instance_id.to_string(),
                reason: "Mock failure".to_string(),
            });
        }

        let mut workloads = self.workloads.lock().await;
        if workloads.contains_key(instance_id) {
            return Err(RuntimeError::LaunchFailed {
                instance_id: instance_id.to_string(),
                reason: format!("container name \"{}\" is already in use", instance_id),
            });
        }

        let host = self.next_host.fetch_add(1, Ordering::SeqCst);
        let address = format!("172.17.{}.{}", host / 250, host % 250);
        workloads.insert(instance_id.to_string(), address.clone());

        if self.never_addressed {
            return Err(RuntimeError::AddressTimeout {
                instance_id: instance_id.to_string(),
                timeout: Duration::ZERO,
            });
        }

        Ok(WorkloadHandle {
            instance_id: instance_id.to_string(),
            internal_address: address,
            started_at,
        })
    }

    async fn stop(&self, instance_id: &str) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);

        if self.fail_stop {
            return Err(RuntimeError::CommandFailed {
                operation: "mock stop".to_string(),
                exit_code: Some(1),
                stderr: "Mock failure".to_string(),
            });
        }

        self.workloads.lock().await.remove(instance_id);
        Ok(())
    }

    async fn internal_address(&self, instance_id: &str) -> Result<Option<String>> {
        Ok(self.workloads.lock().await.get(instance_id).cloned())
    }
}
