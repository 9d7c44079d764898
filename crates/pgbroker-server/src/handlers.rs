// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Broker API handlers.
//!
//! Handlers validate input, delegate to the [`Orchestrator`], and map
//! results to Service Broker API status codes.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pgbroker_core::{
    DeprovisionOutcome, DeprovisionRequest, Orchestrator, ProvisionRequest, ServiceInstance,
};

use crate::catalog::{Catalog, catalog};
use crate::error::ApiError;
use crate::validation::{is_valid_deprovision_request, is_valid_provision_request, is_valid_uuid};

/// State shared across all handlers.
pub struct AppState {
    /// Lifecycle orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// When the server started (for uptime calculation).
    pub start_time: Instant,
    /// Server version string.
    pub version: String,
}

impl AppState {
    /// Create handler state around an orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// `GET /v2/catalog`
pub async fn get_catalog() -> Json<Catalog> {
    Json(catalog())
}

// ============================================================================
// Provision
// ============================================================================

/// Database description in a provision response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Instance id.
    pub name: String,
    /// Instance info.
    pub status: String,
    /// Service tag.
    pub provider: String,
}

/// Body of a successful provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    /// `id;port;info`
    pub dashboard_url: String,
    /// Database description.
    pub database: DatabaseInfo,
}

impl From<ServiceInstance> for ProvisionResponse {
    fn from(instance: ServiceInstance) -> Self {
        Self {
            dashboard_url: instance.dashboard_url(),
            database: DatabaseInfo {
                name: instance.id,
                status: instance.info,
                provider: instance.service,
            },
        }
    }
}

/// `PUT /v2/service_instances/{id}`
pub async fn provision_instance(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProvisionResponse>), ApiError> {
    if !is_valid_uuid(&instance_id) {
        warn!(instance_id = %instance_id, "Rejected provision: malformed instance id");
        return Err(ApiError::BadRequest("instance id is not a UUID".to_string()));
    }

    let request: ProvisionRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(instance_id = %instance_id, error = %e, "Rejected provision: undecodable body");
        ApiError::BadRequest(e.to_string())
    })?;

    if !is_valid_provision_request(&request) {
        warn!(instance_id = %instance_id, "Rejected provision: invalid request fields");
        return Err(ApiError::BadRequest("invalid provision request".to_string()));
    }

    let instance = state
        .orchestrator
        .provision(&instance_id, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(instance.into())))
}

// ============================================================================
// Deprovision
// ============================================================================

/// Raw query string of a deprovision call.
#[derive(Debug, Default, Deserialize)]
pub struct DeprovisionQuery {
    /// Catalog service id.
    pub service_id: Option<String>,
    /// Catalog plan id.
    pub plan_id: Option<String>,
    /// `"true"` enables asynchronous deprovisioning; anything else disables it.
    pub accepts_incomplete: Option<String>,
}

impl From<DeprovisionQuery> for DeprovisionRequest {
    fn from(query: DeprovisionQuery) -> Self {
        Self {
            service_id: query.service_id.unwrap_or_default(),
            plan_id: query.plan_id.unwrap_or_default(),
            accepts_incomplete: query.accepts_incomplete.as_deref() == Some("true"),
        }
    }
}

/// Body of a successful deprovision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionResponse {
    /// Instance id.
    pub id: String,
    /// Always `destroyed`.
    pub status: String,
}

/// `DELETE /v2/service_instances/{id}`
pub async fn deprovision_instance(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    query: Result<Query<DeprovisionQuery>, QueryRejection>,
) -> Result<Json<DeprovisionResponse>, ApiError> {
    if !is_valid_uuid(&instance_id) {
        warn!(instance_id = %instance_id, "Rejected deprovision: malformed instance id");
        return Err(ApiError::BadRequest("instance id is not a UUID".to_string()));
    }

    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = DeprovisionRequest::from(query);

    if !is_valid_deprovision_request(&request) {
        warn!(instance_id = %instance_id, "Rejected deprovision: invalid query");
        return Err(ApiError::BadRequest("invalid deprovision request".to_string()));
    }

    match state.orchestrator.deprovision(&instance_id).await? {
        DeprovisionOutcome::Destroyed => Ok(Json(DeprovisionResponse {
            id: instance_id,
            status: "destroyed".to_string(),
        })),
        DeprovisionOutcome::Gone => {
            info!(instance_id = %instance_id, "Deprovision of unknown instance");
            Err(ApiError::Gone(instance_id))
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the registry answers, `degraded` otherwise.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Server uptime in milliseconds.
    pub uptime_ms: i64,
}

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_healthy = state
        .orchestrator
        .registry()
        .health_check()
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" }.to_string(),
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
    })
}
