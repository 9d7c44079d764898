// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service catalog advertised on `GET /v2/catalog`.

use serde::Serialize;

/// Top-level catalog document.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    /// Offered services.
    pub services: Vec<Service>,
}

/// A service offering.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    /// Display name.
    pub name: String,
    /// Service id.
    pub id: String,
    /// Short description.
    pub description: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Required platform permissions.
    pub requires: Vec<String>,
    /// Whether instances can be bound.
    pub bindable: bool,
    /// Opaque metadata.
    pub metadata: Option<serde_json::Value>,
    /// Dashboard SSO client.
    pub dashboard_client: DashboardClient,
    /// Whether instances can change plan.
    pub plan_updateable: bool,
    /// Plans of this service.
    pub plans: Vec<Plan>,
}

/// Dashboard SSO client registration.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardClient {
    /// Client id.
    pub id: String,
    /// Client secret.
    pub secret: String,
    /// OAuth redirect URI.
    pub redirect_uri: String,
}

/// A service plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Plan id.
    pub id: String,
    /// Plan name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Opaque metadata.
    pub metadata: Option<serde_json::Value>,
    /// Whether the plan is free of charge.
    pub free: bool,
    /// Whether instances of this plan can be bound.
    pub bindable: bool,
}

impl Plan {
    fn free(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            metadata: None,
            free: true,
            bindable: true,
        }
    }
}

/// The broker's fixed catalog.
pub fn catalog() -> Catalog {
    Catalog {
        services: vec![Service {
            name: "posgreSQL".to_string(),
            id: "1".to_string(),
            description: "A postgresql DB service".to_string(),
            tags: Vec::new(),
            requires: Vec::new(),
            bindable: true,
            metadata: None,
            dashboard_client: DashboardClient {
                id: "test".to_string(),
                secret: "test".to_string(),
                redirect_uri: "http://localhost:9000".to_string(),
            },
            plan_updateable: true,
            plans: vec![
                Plan::free(
                    "83c8811b-f3db-17ef-6eb3-bbe944b47262",
                    "5mb",
                    "5 mb of psql database",
                ),
                Plan::free(
                    "39292da3-de98-2891-11f0-c36a3264dbb5",
                    "50mb",
                    "50 mb of psql database",
                ),
            ],
        }],
    }
}
