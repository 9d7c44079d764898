// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request validation.
//!
//! Platform-generated ids (GUIDs) must be lowercase, hyphenated UUIDs.

use std::sync::LazyLock;

use pgbroker_core::{DeprovisionRequest, ProvisionRequest};
use regex::Regex;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("UUID pattern is valid")
});

/// Whether `s` is a lowercase, hyphenated UUID. Empty strings are invalid.
pub fn is_valid_uuid(s: &str) -> bool {
    UUID_RE.is_match(s)
}

/// Whether every required provision field is a valid UUID.
pub fn is_valid_provision_request(request: &ProvisionRequest) -> bool {
    [
        &request.service_id,
        &request.plan_id,
        &request.organization_guid,
        &request.space_guid,
    ]
    .into_iter()
    .all(|field| is_valid_uuid(field))
}

/// Whether a deprovision request is non-empty with UUID service and plan ids.
pub fn is_valid_deprovision_request(request: &DeprovisionRequest) -> bool {
    *request != DeprovisionRequest::default()
        && is_valid_uuid(&request.service_id)
        && is_valid_uuid(&request.plan_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "83c8811b-f3db-17ef-6eb3-bbe944b47262";
    const PLAN: &str = "39292da3-de98-2891-11f0-c36a3264dbb5";

    #[test]
    fn test_valid_uuids() {
        assert!(is_valid_uuid("41653aa4-3a3a-486a-4431-ef258b39f042"));
        assert!(is_valid_uuid("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_invalid_uuids() {
        for value in [
            "",
            "1234567",
            "41653AA4-3A3A-486A-4431-EF258B39F042",
            "41653aa43a3a486a4431ef258b39f042",
            "41653aa4-3a3a-486a-4431-ef258b39f04",
            "41653aa4-3a3a-486a-4431-ef258b39f0421",
            " 41653aa4-3a3a-486a-4431-ef258b39f042",
            "g1653aa4-3a3a-486a-4431-ef258b39f042",
        ] {
            assert!(!is_valid_uuid(value), "{:?} should be rejected", value);
        }
    }

    #[test]
    fn test_provision_request_validation() {
        let valid = ProvisionRequest {
            service_id: SERVICE.to_string(),
            plan_id: PLAN.to_string(),
            organization_guid: SERVICE.to_string(),
            space_guid: PLAN.to_string(),
            ..ProvisionRequest::default()
        };
        assert!(is_valid_provision_request(&valid));

        let missing_space = ProvisionRequest {
            space_guid: String::new(),
            ..valid.clone()
        };
        assert!(!is_valid_provision_request(&missing_space));

        let bad_plan = ProvisionRequest {
            plan_id: "5mb".to_string(),
            ..valid
        };
        assert!(!is_valid_provision_request(&bad_plan));
    }

    #[test]
    fn test_deprovision_request_validation() {
        assert!(!is_valid_deprovision_request(&DeprovisionRequest::default()));

        let valid = DeprovisionRequest {
            service_id: SERVICE.to_string(),
            plan_id: PLAN.to_string(),
            accepts_incomplete: false,
        };
        assert!(is_valid_deprovision_request(&valid));

        let only_flag = DeprovisionRequest {
            accepts_incomplete: true,
            ..DeprovisionRequest::default()
        };
        assert!(!is_valid_deprovision_request(&only_flag));

        let bad_service = DeprovisionRequest {
            service_id: "not-a-uuid".to_string(),
            ..valid
        };
        assert!(!is_valid_deprovision_request(&bad_service));
    }
}
