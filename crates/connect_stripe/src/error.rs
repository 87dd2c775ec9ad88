// --- File: crates/connect_stripe/src/error.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use connect_common::{
    config_error, error_response, external_service_error, internal_error, validation_error,
    DashboardError, HttpStatusCode,
};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::fields::{self, EntityKind};

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
        param: Option<String>,
    },

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("Stripe configuration missing or incomplete")]
    ConfigError,

    /// Webhook signature verification failed
    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    /// Webhook event processing error
    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),

    /// Internal processing error
    #[error("Internal processing error: {0}")]
    InternalError(String),
}

/// Convert StripeError to DashboardError
impl From<StripeError> for DashboardError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(e) => {
                DashboardError::HttpError(format!("Stripe request error: {}", e))
            }
            StripeError::ApiError {
                status_code,
                message,
                ..
            } => external_service_error(
                "Stripe API",
                format!("Status: {}, Message: {}", status_code, message),
            ),
            StripeError::ParseError(e) => {
                DashboardError::ParseError(format!("Stripe response parse error: {}", e))
            }
            StripeError::ConfigError => config_error("Stripe configuration missing or incomplete"),
            StripeError::WebhookSignatureError(msg) => {
                validation_error(format!("Stripe webhook signature error: {}", msg))
            }
            StripeError::WebhookProcessingError(msg) => external_service_error("Stripe webhook", msg),
            StripeError::InternalError(msg) => {
                internal_error(format!("Stripe internal error: {}", msg))
            }
        }
    }
}

impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 502,
            StripeError::ApiError { .. } => 502,
            StripeError::ParseError(_) => 502,
            StripeError::ConfigError => 500,
            StripeError::WebhookSignatureError(_) => 400,
            StripeError::WebhookProcessingError(_) => 500,
            StripeError::InternalError(_) => 500,
        }
    }
}

/// Every way a Connect request can be refused.
///
/// The `invalid-*` code is what forms and JSON clients see; the message is the
/// inline text shown above a re-rendered form.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("invalid-stripeid")]
    InvalidStripeId,
    #[error("invalid-personid")]
    InvalidPersonId,
    #[error("invalid-payoutid")]
    InvalidPayoutId,
    #[error("invalid-countryid")]
    InvalidCountryId,
    #[error("invalid-account")]
    InvalidAccount,
    #[error("invalid-stripe-account")]
    InvalidStripeAccount,
    /// A required field is missing or Stripe rejected its value.
    #[error("invalid-{0}")]
    InvalidField(String),
    #[error("invalid-type")]
    InvalidType,
    #[error("invalid-country")]
    InvalidCountry,
    #[error("invalid-reason")]
    InvalidReason,
    #[error("invalid-company-representative")]
    InvalidCompanyRepresentative,
    #[error("invalid-beneficial-owners")]
    InvalidBeneficialOwners,
    #[error("invalid-company-directors")]
    InvalidCompanyDirectors,
    #[error("invalid-payment-details")]
    InvalidPaymentDetails,
    #[error("invalid-registration")]
    InvalidRegistration,
    #[error("invalid-token")]
    InvalidToken,
    #[error(transparent)]
    Stripe(#[from] StripeError),
}

impl ConnectError {
    pub fn code(&self) -> String {
        match self {
            ConnectError::Stripe(_) => "stripe-error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ConnectError::InvalidStripeId => "Stripe account is missing or could not be found".to_string(),
            ConnectError::InvalidPersonId => "Person is missing or could not be found".to_string(),
            ConnectError::InvalidPayoutId => "Payout is missing or could not be found".to_string(),
            ConnectError::InvalidCountryId => "Country is missing or not supported".to_string(),
            ConnectError::InvalidAccount => "You do not have access to this item".to_string(),
            ConnectError::InvalidStripeAccount => {
                "This Stripe account cannot be changed in its current state".to_string()
            }
            ConnectError::InvalidField(field) => {
                format!("Please check the value of \"{}\"", fields::label(field))
            }
            ConnectError::InvalidType => "Choose either a company or an individual account".to_string(),
            ConnectError::InvalidCountry => "This country is not supported".to_string(),
            ConnectError::InvalidReason => {
                "Reason must be one of fraud, terms_of_service or other".to_string()
            }
            ConnectError::InvalidCompanyRepresentative => {
                "A company representative must be registered before submitting".to_string()
            }
            ConnectError::InvalidBeneficialOwners => {
                "Beneficial owners must be submitted before submitting the registration".to_string()
            }
            ConnectError::InvalidCompanyDirectors => {
                "Company directors must be submitted before submitting the registration".to_string()
            }
            ConnectError::InvalidPaymentDetails => {
                "Payment details must be provided before submitting".to_string()
            }
            ConnectError::InvalidRegistration => {
                "The registration is incomplete and cannot be submitted yet".to_string()
            }
            ConnectError::InvalidToken => "The Stripe.js token is missing or invalid".to_string(),
            ConnectError::Stripe(_) => "Stripe could not process the request, please try again".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ConnectError::InvalidAccount => StatusCode::FORBIDDEN,
            ConnectError::Stripe(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Maps a Stripe failure on a form submission back to the form field
    /// it concerns, when Stripe names one.
    pub fn from_stripe(
        kind: EntityKind,
        submitted: &BTreeMap<String, String>,
        err: StripeError,
    ) -> Self {
        if let StripeError::ApiError {
            param: Some(param), ..
        } = &err
        {
            if param == "account_token" || param == "person_token" {
                return ConnectError::InvalidToken;
            }
            if let Some(field) = fields::field_for_param(kind, param, submitted) {
                return ConnectError::InvalidField(field.to_string());
            }
        }
        ConnectError::Stripe(err)
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        match self {
            ConnectError::Stripe(err) => DashboardError::from(err).into_response(),
            other => error_response(other.status(), &other.code(), &other.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(param: Option<&str>) -> StripeError {
        StripeError::ApiError {
            status_code: 400,
            message: "Invalid value".to_string(),
            param: param.map(str::to_string),
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ConnectError::InvalidStripeId.code(), "invalid-stripeid");
        assert_eq!(ConnectError::InvalidStripeAccount.code(), "invalid-stripe-account");
        assert_eq!(
            ConnectError::InvalidField("company_name".to_string()).code(),
            "invalid-company_name"
        );
        assert_eq!(ConnectError::Stripe(StripeError::ConfigError).code(), "stripe-error");
    }

    #[test]
    fn test_status() {
        assert_eq!(ConnectError::InvalidAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(ConnectError::InvalidType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ConnectError::Stripe(StripeError::ConfigError).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_stripe_maps_param_to_field() {
        let submitted = BTreeMap::new();
        let err = ConnectError::from_stripe(
            EntityKind::Company,
            &submitted,
            api_error(Some("company[tax_id]")),
        );
        assert!(matches!(err, ConnectError::InvalidField(ref f) if f == "company_tax_id"));

        let err =
            ConnectError::from_stripe(EntityKind::Director, &submitted, api_error(Some("person_token")));
        assert!(matches!(err, ConnectError::InvalidToken));

        let err =
            ConnectError::from_stripe(EntityKind::Company, &submitted, api_error(Some("unrelated")));
        assert!(matches!(err, ConnectError::Stripe(_)));

        let err = ConnectError::from_stripe(EntityKind::Company, &submitted, api_error(None));
        assert!(matches!(err, ConnectError::Stripe(_)));
    }

    #[test]
    fn test_stripe_error_to_dashboard_error() {
        let err: DashboardError = api_error(None).into();
        assert!(matches!(err, DashboardError::ExternalServiceError { .. }));
        assert_eq!(err.status_code(), 502);

        let err: DashboardError = StripeError::ConfigError.into();
        assert!(matches!(err, DashboardError::ConfigError(_)));
        assert_eq!(err.status_code(), 500);

        let err: DashboardError = StripeError::WebhookSignatureError("mismatch".to_string()).into();
        assert!(matches!(err, DashboardError::ValidationError(_)));
        assert_eq!(err.status_code(), 400);
    }
}
