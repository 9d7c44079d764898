// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP tests for the broker API.

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode};

use common::{
    PLAN_ID, SERVICE_ID, TestApp, assert_empty_error, deprovision_query, json_body, provision_body,
};
use pgbroker_core::runtime::MockRuntime;

const INSTANCE_ID: &str = "41653aa4-3a3a-486a-4431-ef258b39f042";

#[tokio::test]
async fn test_catalog() {
    let app = TestApp::new().await;

    let response = app.send(Method::GET, "/v2/catalog", Body::empty()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let catalog = json_body(response).await;
    let service = &catalog["services"][0];
    assert_eq!(service["name"], "posgreSQL");
    assert_eq!(service["bindable"], true);
    assert_eq!(service["plans"][0]["id"], "83c8811b-f3db-17ef-6eb3-bbe944b47262");
}

#[tokio::test]
async fn test_provision_on_empty_registry() {
    let app = TestApp::new().await;

    let response = app.provision(INSTANCE_ID, provision_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(
        body,
        serde_json::json!({
            "dashboard_url": format!("{};5432;default", INSTANCE_ID),
            "database": {
                "name": INSTANCE_ID,
                "status": "default",
                "provider": "PostgreSQL",
            }
        })
    );

    let record = app.registry.get(INSTANCE_ID).await.unwrap().unwrap();
    assert_eq!(record.port, 5432);
    assert!(app.runtime.is_running(INSTANCE_ID).await);
}

#[tokio::test]
async fn test_provision_next_port() {
    let app = TestApp::new().await;

    app.provision(INSTANCE_ID, provision_body()).await;
    let response = app
        .provision("c0ffee00-0000-4000-8000-000000000001", provision_body())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(
        body["dashboard_url"],
        "c0ffee00-0000-4000-8000-000000000001;5433;default"
    );
}

#[tokio::test]
async fn test_provision_malformed_id() {
    let app = TestApp::new().await;

    let response = app.provision("1234567", provision_body()).await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(app.runtime.start_calls(), 0);
}

#[tokio::test]
async fn test_provision_undecodable_body() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Method::PUT,
            &format!("/v2/service_instances/{}", INSTANCE_ID),
            Body::from("{not json"),
        )
        .await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_provision_invalid_fields() {
    let app = TestApp::new().await;

    let mut body = provision_body();
    body["space_guid"] = serde_json::json!("not-a-guid");
    let response = app.provision(INSTANCE_ID, body).await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    let mut body = provision_body();
    body.as_object_mut().unwrap().remove("plan_id");
    let response = app.provision(INSTANCE_ID, body).await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    assert!(app.registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provision_duplicate_is_server_error() {
    let app = TestApp::new().await;

    app.provision(INSTANCE_ID, provision_body()).await;
    let response = app.provision(INSTANCE_ID, provision_body()).await;
    assert_empty_error(response, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert_eq!(app.registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_provision_launch_failure() {
    let app = TestApp::with_runtime(MockRuntime::failing()).await;

    let response = app.provision(INSTANCE_ID, provision_body()).await;
    assert_empty_error(response, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert!(app.registry.get(INSTANCE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deprovision_after_provision() {
    let app = TestApp::new().await;
    app.provision(INSTANCE_ID, provision_body()).await;

    let response = app.deprovision(INSTANCE_ID, &deprovision_query()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "id": INSTANCE_ID, "status": "destroyed" })
    );

    assert!(app.registry.get(INSTANCE_ID).await.unwrap().is_none());
    assert!(!app.runtime.is_running(INSTANCE_ID).await);
    assert!(app.network.rules().await.is_empty());

    let response = app.deprovision(INSTANCE_ID, &deprovision_query()).await;
    assert_empty_error(response, StatusCode::GONE).await;
}

#[tokio::test]
async fn test_deprovision_unknown_is_gone() {
    let app = TestApp::new().await;

    let response = app
        .deprovision("00000000-0000-0000-0000-000000000000", &deprovision_query())
        .await;
    assert_empty_error(response, StatusCode::GONE).await;
}

#[tokio::test]
async fn test_deprovision_invalid_requests() {
    let app = TestApp::new().await;
    app.provision(INSTANCE_ID, provision_body()).await;

    let response = app.deprovision("1234567", &deprovision_query()).await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    let response = app.deprovision(INSTANCE_ID, "").await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .deprovision(INSTANCE_ID, &format!("service_id={}", SERVICE_ID))
        .await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .deprovision(
            INSTANCE_ID,
            &format!("service_id=not-a-uuid&plan_id={}", PLAN_ID),
        )
        .await;
    assert_empty_error(response, StatusCode::BAD_REQUEST).await;

    // Nothing was torn down.
    assert!(app.registry.get(INSTANCE_ID).await.unwrap().is_some());
    assert!(app.runtime.is_running(INSTANCE_ID).await);
}

#[tokio::test]
async fn test_deprovision_stop_failure_is_server_error() {
    let app = TestApp::with_runtime(MockRuntime::failing_stop()).await;
    app.provision(INSTANCE_ID, provision_body()).await;

    let response = app.deprovision(INSTANCE_ID, &deprovision_query()).await;
    assert_empty_error(response, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert!(app.registry.get(INSTANCE_ID).await.unwrap().is_some());
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.send(Method::GET, "/health", Body::empty()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
