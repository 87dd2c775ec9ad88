// --- File: crates/connect_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{DashboardError, HttpStatusCode};

pub mod client;

/// Builds the JSON error body every Connect endpoint answers with:
/// `{"error": {"code": ..., "message": ...}}`.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = Json(json!({
        "error": {
            "code": code,
            "message": message,
        }
    }));
    (status, body).into_response()
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &self {
            DashboardError::HttpError(_) => "http-error",
            DashboardError::ParseError(_) => "parse-error",
            DashboardError::ConfigError(_) => "config-error",
            DashboardError::AuthError(_) => "unauthorized",
            DashboardError::ValidationError(_) => "invalid-request",
            DashboardError::ExternalServiceError { .. } => "external-service-error",
            DashboardError::InternalError(_) => "internal-error",
        };
        error_response(status_code, code, &self.to_string())
    }
}
