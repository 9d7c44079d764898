// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for pgbroker-core integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use pgbroker_core::network::MockNetworkRules;
use pgbroker_core::runtime::MockRuntime;
use pgbroker_core::{Orchestrator, OrchestratorConfig, ProvisionRequest, RegistryStore};

/// A registry in a temp directory, removed when dropped.
pub struct TestRegistry {
    pub store: RegistryStore,
    pub db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestRegistry {
    pub async fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("registry.db");
        let store = RegistryStore::from_path(&db_path)
            .await
            .expect("Failed to open registry");
        store
            .create_schema_if_missing()
            .await
            .expect("Failed to create schema");

        Self {
            store,
            db_path,
            _temp_dir: temp_dir,
        }
    }
}

impl TestRegistry {
    /// Make every insert of `instance_id` fail at the database level.
    pub async fn reject_inserts_of(&self, instance_id: &str) {
        let url = format!("sqlite:{}", self.db_path.to_string_lossy());
        let pool = sqlx::SqlitePool::connect(&url)
            .await
            .expect("Failed to open second connection");
        let trigger = format!(
            "CREATE TRIGGER reject_insert BEFORE INSERT ON service_instance \
             WHEN NEW.id = '{}' BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;",
            instance_id
        );
        sqlx::raw_sql(&trigger)
            .execute(&pool)
            .await
            .expect("Failed to create trigger");
        pool.close().await;
    }
}

/// Orchestrator wired to mock collaborators.
pub struct TestContext {
    pub orchestrator: Arc<Orchestrator>,
    pub runtime: Arc<MockRuntime>,
    pub network: Arc<MockNetworkRules>,
    pub registry: TestRegistry,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with(MockRuntime::new(), MockNetworkRules::new(), OrchestratorConfig::default()).await
    }

    pub async fn with(
        runtime: MockRuntime,
        network: MockNetworkRules,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = TestRegistry::new().await;
        let runtime = Arc::new(runtime);
        let network = Arc::new(network);
        let orchestrator = Arc::new(Orchestrator::new(
            registry.store.clone(),
            runtime.clone(),
            network.clone(),
            config,
        ));

        Self {
            orchestrator,
            runtime,
            network,
            registry,
        }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.registry.store
    }
}

/// A well-formed provision request.
pub fn provision_request() -> ProvisionRequest {
    ProvisionRequest {
        service_id: "83c8811b-f3db-17ef-6eb3-bbe944b47262".to_string(),
        plan_id: "39292da3-de98-2891-11f0-c36a3264dbb5".to_string(),
        parameters: None,
        accepts_incomplete: false,
        organization_guid: "11111111-2222-3333-4444-555555555555".to_string(),
        space_guid: "66666666-7777-8888-9999-000000000000".to_string(),
    }
}

pub fn new_instance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
