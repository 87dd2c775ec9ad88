// --- File: crates/connect_stripe/src/test_support.rs ---
//! Fixtures shared by the logic, handler and page tests.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use connect_config::{AppConfig, DashboardConfig, StripeConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::client::MockConnectApi;
use crate::countries::CountryTable;
use crate::handlers::ConnectState;
use crate::index::MemoryIndex;
use crate::models::{Person, StripeAccount};
use crate::session::DashboardAccount;

pub const OWNER: &str = "dash_owner";
pub const STRANGER: &str = "dash_stranger";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn config(page_size: usize) -> AppConfig {
    AppConfig {
        use_stripe: true,
        stripe: Some(StripeConfig {
            secret_key: Some("sk_test_123".to_string()),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            ..StripeConfig::default()
        }),
        dashboard: DashboardConfig {
            page_size,
            ..DashboardConfig::default()
        },
        ..AppConfig::default()
    }
}

pub fn state_with(api: MockConnectApi, index: Arc<MemoryIndex>, config: AppConfig) -> Arc<ConnectState> {
    Arc::new(ConnectState {
        config: Arc::new(config),
        api: Arc::new(api),
        index,
        countries: Arc::new(CountryTable::embedded().unwrap()),
    })
}

pub fn state(api: MockConnectApi) -> Arc<ConnectState> {
    state_with(api, Arc::new(MemoryIndex::new()), config(10))
}

pub fn caller(account_id: &str) -> DashboardAccount {
    DashboardAccount {
        account_id: account_id.to_string(),
        administrator: false,
        ip: Some("203.0.113.9".to_string()),
        user_agent: Some("test-agent".to_string()),
    }
}

/// A Stripe account as the API returns it; `extra` is merged on top.
pub fn account(id: &str, business_type: &str, country: &str, extra: Value) -> StripeAccount {
    let mut value = json!({
        "id": id,
        "object": "account",
        "business_type": business_type,
        "country": country,
        "metadata": { "accountid": OWNER },
        "requirements": { "currently_due": [] },
    });
    if let (Some(base), Value::Object(extra)) = (value.as_object_mut(), extra) {
        base.extend(extra);
    }
    serde_json::from_value(value).unwrap()
}

pub fn submitted_metadata() -> Value {
    json!({ "metadata": { "accountid": OWNER, "submitted": "1700000000" } })
}

pub fn with_bank_account() -> Value {
    json!({
        "external_accounts": {
            "object": "list",
            "data": [{ "id": "ba_1", "object": "bank_account", "last4": "3000" }],
            "has_more": false,
            "url": "/v1/accounts/acct_1/external_accounts"
        }
    })
}

pub fn person(id: &str, stripe_id: &str, relationship: Value) -> Person {
    serde_json::from_value(json!({
        "id": id,
        "object": "person",
        "account": stripe_id,
        "first_name": "Erika",
        "last_name": "Mustermann",
        "relationship": relationship,
    }))
    .unwrap()
}

pub fn request(method: &str, uri: &str, account_id: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match account_id {
        Some(id) => builder.header("x-account-id", id),
        None => builder,
    }
}

pub fn empty(builder: axum::http::request::Builder) -> Request<Body> {
    builder.body(Body::empty()).unwrap()
}

pub fn json_body(builder: axum::http::request::Builder, body: Value) -> Request<Body> {
    builder
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_body(builder: axum::http::request::Builder, pairs: &[(&str, &str)]) -> Request<Body> {
    builder
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(serde_urlencoded::to_string(pairs).unwrap()))
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
