// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error responses.
//!
//! Every failure answers with an empty JSON object; only the status code
//! carries meaning for the platform.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Errors returned from broker handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The instance does not exist.
    #[error("Instance {0} does not exist")]
    Gone(String),

    /// Lifecycle failure.
    #[error(transparent)]
    Internal(#[from] pgbroker_core::Error),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Gone(_) => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!(error_code = e.error_code(), error = %e, "Request failed");
        }
        (self.status(), Json(serde_json::json!({}))).into_response()
    }
}
