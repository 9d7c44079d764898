// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workload runtime trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::command::CommandError;

/// Errors from workload runtime operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The runtime refused to start the workload.
    #[error("Failed to launch workload {instance_id}: {reason}")]
    LaunchFailed {
        /// Instance the workload belongs to.
        instance_id: String,
        /// Runtime-reported reason.
        reason: String,
    },

    /// The workload never reported a network address.
    #[error("Workload {instance_id} reported no address within {}s", timeout.as_secs())]
    AddressTimeout {
        /// Instance the workload belongs to.
        instance_id: String,
        /// Inspection bound that elapsed.
        timeout: Duration,
    },

    /// A runtime CLI call exited unsuccessfully.
    #[error("{operation} failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        /// What was being attempted (e.g. "docker stop").
        operation: String,
        /// Exit code, if any.
        exit_code: Option<i32>,
        /// Standard error of the call.
        stderr: String,
    },

    /// A runtime CLI call could not run to completion.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Runtime output could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// A started workload.
#[derive(Debug, Clone)]
pub struct WorkloadHandle {
    /// Instance id; also the workload name.
    pub instance_id: String,
    /// Address of the workload on the runtime's internal network.
    pub internal_address: String,
    /// When the launch was issued.
    pub started_at: DateTime<Utc>,
}

/// Trait for workload runtimes.
///
/// Runtimes only manage workloads; they never touch the registry. Workloads
/// are addressed by instance id.
#[async_trait]
pub trait WorkloadRuntime: Send + Sync {
    /// Runtime type identifier (e.g. "docker", "mock").
    fn runtime_type(&self) -> &'static str;

    /// Launch the workload for `instance_id` and wait, within a bounded
    /// time, for it to report an internal address.
    async fn start(&self, instance_id: &str) -> Result<WorkloadHandle>;

    /// Stop and remove the workload. A workload that does not exist counts
    /// as stopped.
    async fn stop(&self, instance_id: &str) -> Result<()>;

    /// Current internal address of the workload, or `None` if it does not
    /// exist or has no address.
    async fn internal_address(&self, instance_id: &str) -> Result<Option<String>>;
}
