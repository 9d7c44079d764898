// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance Registry
//!
//! SQLite-backed store of [`ServiceInstance`] records. The registry is the
//! source of truth for which instances exist and which ports they hold.
//!
//! Port allocation and the insert that claims the port must not interleave
//! with another provision. [`RegistryStore::reserve_port`] takes the
//! store-wide write lock and keeps it inside the returned
//! [`PortReservation`] until the record is committed or the reservation is
//! dropped.

use std::path::Path;
use std::sync::Arc;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ports;
use crate::types::ServiceInstance;

/// Schema applied by [`RegistryStore::create_schema_if_missing`].
const SCHEMA_SQL: &str = include_str!("../migrations/schema.sql");

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Guard proving the holder has exclusive write access to the registry.
pub type RegistryGuard = OwnedMutexGuard<()>;

/// Registry client over a shared SQLite pool.
///
/// Cloning is cheap; clones share the pool and the write lock.
#[derive(Clone)]
pub struct RegistryStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl RegistryStore {
    /// Create a registry over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to a registry database URL (e.g. `sqlite:pgbroker.db?mode=rwc`).
    ///
    /// Every connection to `sqlite::memory:` opens its own empty database, so
    /// in-memory URLs get a single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Open (creating if needed) a registry database file.
    ///
    /// Parent directories are created when missing.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::Database(sqlx::Error::Io(e)))?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::connect(&url).await
    }

    /// Create the registry table if it does not exist yet.
    ///
    /// Idempotent; called once at startup.
    pub async fn create_schema_if_missing(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        debug!("Registry schema verified");
        Ok(())
    }

    /// Check that the database answers queries.
    pub async fn health_check(&self) -> Result<bool> {
        let value: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(value == 1)
    }

    /// Highest port currently recorded, or `None` when the registry is empty.
    pub async fn max_allocated_port(&self) -> Result<Option<u16>> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(port) FROM service_instance")
            .fetch_one(&self.pool)
            .await?;

        max.map(port_from_db).transpose()
    }

    /// Look up a record by instance id.
    pub async fn get(&self, instance_id: &str) -> Result<Option<ServiceInstance>> {
        let row = sqlx::query_as::<_, (String, String, i64, String)>(
            "SELECT id, service, port, info FROM service_instance WHERE id = ?",
        )
        .bind(instance_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(instance_from_row).transpose()
    }

    /// List every record, ordered by port.
    pub async fn list(&self) -> Result<Vec<ServiceInstance>> {
        let rows = sqlx::query_as::<_, (String, String, i64, String)>(
            "SELECT id, service, port, info FROM service_instance ORDER BY port",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(instance_from_row).collect()
    }

    /// Insert a record.
    ///
    /// Fails with [`Error::AlreadyExists`] when the id is taken and
    /// [`Error::PortTaken`] when the port is.
    pub async fn insert(&self, instance: &ServiceInstance) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO service_instance (id, service, port, info)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.service)
        .bind(i64::from(instance.port))
        .bind(&instance.info)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    instance_id = %instance.id,
                    port = instance.port,
                    "Registered instance"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if is_unique_violation(db_err.as_ref()) => {
                if db_err.message().contains("service_instance.port") {
                    Err(Error::PortTaken {
                        port: instance.port,
                    })
                } else {
                    Err(Error::AlreadyExists {
                        instance_id: instance.id.clone(),
                    })
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a record, returning the number of rows removed (0 or 1).
    pub async fn delete(&self, instance_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM service_instance WHERE id = ?")
            .bind(instance_id)
            .execute(&self.pool)
            .await?;

        debug!(
            instance_id = %instance_id,
            rows_affected = result.rows_affected(),
            "Deleted instance record"
        );

        Ok(result.rows_affected())
    }

    /// Acquire the registry write lock without allocating a port.
    pub async fn exclusive(&self) -> RegistryGuard {
        self.write_lock.clone().lock_owned().await
    }

    /// Allocate the next port and hold the write lock until the reservation
    /// is committed or dropped.
    pub async fn reserve_port(&self, default_port: u16) -> Result<PortReservation> {
        let guard = self.exclusive().await;
        let port = ports::allocate(self, default_port).await?;

        debug!(port, "Reserved port");

        Ok(PortReservation {
            store: self.clone(),
            port,
            _guard: guard,
        })
    }
}

/// A port allocated under the registry write lock.
///
/// Dropping the reservation releases the lock without recording anything.
pub struct PortReservation {
    store: RegistryStore,
    port: u16,
    _guard: RegistryGuard,
}

impl PortReservation {
    /// The reserved port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Insert the record claiming the reserved port, then release the lock.
    pub async fn commit(
        self,
        instance_id: &str,
        service: &str,
        info: &str,
    ) -> Result<ServiceInstance> {
        let instance = ServiceInstance {
            id: instance_id.to_string(),
            service: service.to_string(),
            port: self.port,
            info: info.to_string(),
        };
        self.store.insert(&instance).await?;
        Ok(instance)
    }
}

fn is_unique_violation(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.is_unique_violation() || err.message().contains("UNIQUE constraint failed")
}

fn port_from_db(value: i64) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        Error::Database(sqlx::Error::Decode(
            format!("stored port {} is out of range", value).into(),
        ))
    })
}

fn instance_from_row(row: (String, String, i64, String)) -> Result<ServiceInstance> {
    let (id, service, port, info) = row;
    Ok(ServiceInstance {
        id,
        service,
        port: port_from_db(port)?,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from_db_range() {
        assert_eq!(port_from_db(5432).unwrap(), 5432);
        assert_eq!(port_from_db(65535).unwrap(), 65535);
        assert!(port_from_db(-1).is_err());
        assert!(port_from_db(70000).is_err());
    }

    #[test]
    fn test_in_memory_url_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:registry?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:pgbroker.db?mode=rwc"));
    }

    #[tokio::test]
    async fn test_dropped_reservation_releases_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RegistryStore::from_path(dir.path().join("registry.db"))
            .await
            .unwrap();
        store.create_schema_if_missing().await.unwrap();

        let first = store.reserve_port(5432).await.unwrap();
        assert_eq!(first.port(), 5432);
        drop(first);

        // Nothing was committed, so the same port comes back.
        let second = store.reserve_port(5432).await.unwrap();
        assert_eq!(second.port(), 5432);
    }
}
