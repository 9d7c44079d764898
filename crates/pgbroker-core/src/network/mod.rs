// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Forwarding rules from host ports to workload addresses.

pub mod iptables;
pub mod mock;
mod traits;

pub use iptables::{IptablesConfig, IptablesRules};
pub use mock::MockNetworkRules;
pub use traits::*;
