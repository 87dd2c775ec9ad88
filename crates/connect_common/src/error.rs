// --- File: crates/connect_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by the Connect crates.
///
/// Feature crates keep their own error enums and implement
/// `From<SpecificError> for DashboardError` to reach an HTTP response.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The host dashboard did not identify the caller
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for DashboardError {
    fn status_code(&self) -> u16 {
        match self {
            DashboardError::HttpError(_) => 500,
            DashboardError::ParseError(_) => 400,
            DashboardError::ConfigError(_) => 500,
            DashboardError::AuthError(_) => 401,
            DashboardError::ValidationError(_) => 400,
            DashboardError::ExternalServiceError { .. } => 502,
            DashboardError::InternalError(_) => 500,
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::ParseError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> DashboardError {
    DashboardError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> DashboardError {
    DashboardError::ValidationError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> DashboardError {
    DashboardError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> DashboardError {
    DashboardError::InternalError(message.to_string())
}
