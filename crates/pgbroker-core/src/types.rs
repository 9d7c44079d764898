// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Records and requests shared between the orchestrator and its callers.

use serde::{Deserialize, Serialize};

/// Durable record of a provisioned instance, as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance id supplied by the platform (UUID).
    pub id: String,
    /// Service tag, fixed for this broker.
    pub service: String,
    /// Externally reachable host port.
    pub port: u16,
    /// Free-text status/description.
    pub info: String,
}

impl ServiceInstance {
    /// Compatibility encoding of the record used as the provision response's
    /// `dashboard_url`: `id;port;info`.
    pub fn dashboard_url(&self) -> String {
        format!("{};{};{}", self.id, self.port, self.info)
    }
}

/// Body of `PUT /v2/service_instances/{id}`.
///
/// Every field defaults when absent so that shape problems surface as
/// validation failures rather than decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionRequest {
    /// Catalog service id.
    pub service_id: String,
    /// Catalog plan id.
    pub plan_id: String,
    /// Opaque provisioning parameters.
    pub parameters: Option<serde_json::Value>,
    /// Whether the platform accepts asynchronous provisioning.
    pub accepts_incomplete: bool,
    /// Platform organization GUID.
    pub organization_guid: String,
    /// Platform space GUID.
    pub space_guid: String,
}

/// Query of `DELETE /v2/service_instances/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionRequest {
    /// Catalog service id.
    pub service_id: String,
    /// Catalog plan id.
    pub plan_id: String,
    /// Whether the platform accepts asynchronous deprovisioning.
    pub accepts_incomplete: bool,
}

/// Result of a deprovision call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprovisionOutcome {
    /// The registry record was removed.
    Destroyed,
    /// No registry record matched the id.
    Gone,
}

impl DeprovisionOutcome {
    /// Map the number of deleted registry rows to an outcome.
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 { Self::Gone } else { Self::Destroyed }
    }
}
