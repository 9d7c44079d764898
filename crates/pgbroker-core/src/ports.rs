// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Port allocation.
//!
//! Ports are handed out monotonically above the highest recorded port. The
//! functions here are not synchronized; callers go through
//! [`RegistryStore::reserve_port`](crate::registry::RegistryStore::reserve_port)
//! so the read and the following insert happen under one lock.

use crate::error::{Error, Result};
use crate::registry::RegistryStore;

/// Default PostgreSQL port, used for the first instance.
pub const DEFAULT_PORT: u16 = 5432;

/// Next usable port given the highest recorded one.
pub fn next_port(max_allocated: Option<u16>, default_port: u16) -> Result<u16> {
    match max_allocated {
        None => Ok(default_port),
        Some(max) => max
            .checked_add(1)
            .ok_or(Error::PortsExhausted { max }),
    }
}

/// Read the current maximum from the registry and derive the next port.
pub async fn allocate(store: &RegistryStore, default_port: u16) -> Result<u16> {
    let max = store.max_allocated_port().await?;
    next_port(max, default_port)
}
