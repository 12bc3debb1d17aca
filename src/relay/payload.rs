// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Body of an upstream response as the gateway understood it.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayPayload {
    /// The body parsed as JSON.
    Json(Value),
    /// Anything else, verbatim.
    Text(String),
}

impl RelayPayload {
    /// Classify an upstream body.
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => RelayPayload::Json(value),
            Err(_) => RelayPayload::Text(text),
        }
    }

    /// The JSON value sent to the caller; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            RelayPayload::Json(value) => value,
            RelayPayload::Text(text) => Value::String(text),
        }
    }
}

/// What the gateway answers for one relayed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    pub status: StatusCode,
    pub payload: RelayPayload,
}

impl RelayOutcome {
    pub fn new(status: StatusCode, payload: RelayPayload) -> Self {
        Self { status, payload }
    }

    /// The upstream could not be reached or did not answer in time.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            RelayPayload::Json(json!({ "detail": message.into() })),
        )
    }
}

impl IntoResponse for RelayOutcome {
    fn into_response(self) -> Response {
        // These statuses must not carry a body.
        if matches!(self.status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED) {
            return self.status.into_response();
        }
        (self.status, Json(self.payload.into_value())).into_response()
    }
}
