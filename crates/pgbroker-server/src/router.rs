// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP routes.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    AppState, deprovision_instance, get_catalog, health_check, provision_instance,
};

/// Build the broker router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v2/catalog", get(get_catalog))
        .route(
            "/v2/service_instances/{id}",
            put(provision_instance).delete(deprovision_instance),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
