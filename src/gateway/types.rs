//! HTTP response types.
//!
//! The envelope *mechanism* (a typed error with a `StatusCode` and an
//! `IntoResponse` impl) follows the teacher's `gateway/types/response.rs`.
//! The JSON *shape* follows spec.md §6's wire contract exactly, which uses
//! bespoke keys per outcome rather than the teacher's uniform
//! `{code, msg, data}` envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Numeric codes for the handful of failure shapes this gateway can
/// produce, following the teacher's `error_codes` module convention.
pub mod error_codes {
    pub const ALREADY_PURCHASED: u32 = 1001;
    pub const NOT_PURCHASED: u32 = 1002;
    pub const INTERNAL: u32 = 1003;
}

pub struct ApiError {
    pub status: StatusCode,
    pub code: u32,
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: error_codes::INTERNAL,
            message: message.into(),
        }
    }

    pub fn not_purchased(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: error_codes::NOT_PURCHASED,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.message, "code": self.code })),
        )
            .into_response()
    }
}

/// `SUCCESS` body: `{"success": true, "stock": <n>}`.
pub fn success_body(remaining_stock: i64) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "stock": remaining_stock })),
    )
}

/// `WAITING` body: `{"status": "WAITING", "rank": <n>}`.
pub fn waiting_body(rank: u64) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "WAITING", "rank": rank })),
    )
}

/// `ALREADY_PURCHASED` body: `{"error": "one ticket per user", "code": 1001}`.
pub fn already_purchased_body() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "one ticket per user",
            "code": error_codes::ALREADY_PURCHASED,
        })),
    )
}

/// `SOLD_OUT` body: `{"success": false, "stock": 0}`.
pub fn sold_out_body() -> impl IntoResponse {
    (
        StatusCode::GONE,
        Json(json!({ "success": false, "stock": 0 })),
    )
}
