// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for pgbroker-server HTTP tests.
//!
//! Builds the router over a temp SQLite registry and mock collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use pgbroker_core::network::MockNetworkRules;
use pgbroker_core::runtime::MockRuntime;
use pgbroker_core::{Orchestrator, OrchestratorConfig, RegistryStore};
use pgbroker_server::{AppState, build_router};

pub const SERVICE_ID: &str = "83c8811b-f3db-17ef-6eb3-bbe944b47262";
pub const PLAN_ID: &str = "39292da3-de98-2891-11f0-c36a3264dbb5";
pub const ORG_GUID: &str = "11111111-2222-3333-4444-555555555555";
pub const SPACE_GUID: &str = "66666666-7777-8888-9999-000000000000";

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub registry: RegistryStore,
    pub runtime: Arc<MockRuntime>,
    pub network: Arc<MockNetworkRules>,
    _temp_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_runtime(MockRuntime::new()).await
    }

    pub async fn with_runtime(runtime: MockRuntime) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let registry = RegistryStore::from_path(temp_dir.path().join("registry.db"))
            .await
            .expect("Failed to open registry");
        registry
            .create_schema_if_missing()
            .await
            .expect("Failed to create schema");

        let runtime = Arc::new(runtime);
        let network = Arc::new(MockNetworkRules::new());
        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            runtime.clone(),
            network.clone(),
            OrchestratorConfig::default(),
        ));
        let router = build_router(Arc::new(AppState::new(orchestrator)));

        Self {
            router,
            registry,
            runtime,
            network,
            _temp_dir: temp_dir,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, method: Method, uri: &str, body: Body) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("Failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    pub async fn provision(&self, instance_id: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Method::PUT,
            &format!("/v2/service_instances/{}", instance_id),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn deprovision(&self, instance_id: &str, query: &str) -> Response<Body> {
        self.send(
            Method::DELETE,
            &format!("/v2/service_instances/{}?{}", instance_id, query),
            Body::empty(),
        )
        .await
    }
}

/// A provision body with every required field.
pub fn provision_body() -> serde_json::Value {
    serde_json::json!({
        "service_id": SERVICE_ID,
        "plan_id": PLAN_ID,
        "organization_guid": ORG_GUID,
        "space_guid": SPACE_GUID,
        "parameters": {},
        "accepts_incomplete": false,
    })
}

/// A deprovision query matching the catalog.
pub fn deprovision_query() -> String {
    format!(
        "service_id={}&plan_id={}&accepts_incomplete=false",
        SERVICE_ID, PLAN_ID
    )
}

/// Read a response body as JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Assert the status and the `{}` error body.
pub async fn assert_empty_error(response: Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(json_body(response).await, serde_json::json!({}));
}
