// --- File: crates/connect_stripe/src/session.rs ---
//! The signed-in dashboard account, as forwarded by the host dashboard.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use connect_common::DashboardError;
use std::{net::SocketAddr, sync::Arc};
use tracing::warn;

use crate::handlers::ConnectState;

/// Identity of the caller. The host dashboard authenticates the session and
/// forwards the account id in a header; requests without it are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardAccount {
    pub account_id: String,
    pub administrator: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// First address of `X-Forwarded-For`, else the socket peer.
fn client_ip(parts: &Parts) -> Option<String> {
    header_value(&parts.headers, "x-forwarded-for")
        .and_then(|forwarded| {
            forwarded
                .split(',')
                .next()
                .map(|ip| ip.trim().to_string())
        })
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

impl FromRequestParts<Arc<ConnectState>> for DashboardAccount {
    type Rejection = DashboardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ConnectState>,
    ) -> Result<Self, Self::Rejection> {
        let dashboard = &state.config.dashboard;
        let Some(account_id) = header_value(&parts.headers, &dashboard.account_header) else {
            warn!("[Connect] Request to {} without {}", parts.uri.path(), dashboard.account_header);
            return Err(DashboardError::AuthError(
                "No dashboard account on this request".to_string(),
            ));
        };
        let administrator = header_value(&parts.headers, &dashboard.administrator_header)
            .is_some_and(|value| value.eq_ignore_ascii_case("true") || value == "1");

        Ok(DashboardAccount {
            account_id,
            administrator,
            ip: client_ip(parts),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut p = parts(
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
        );
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));
        assert_eq!(client_ip(&p).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_client_ip_falls_back_to_socket() {
        let mut p = parts(Request::builder().uri("/"));
        assert_eq!(client_ip(&p), None);
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 9000))));
        assert_eq!(client_ip(&p).as_deref(), Some("192.0.2.4"));
    }
}
