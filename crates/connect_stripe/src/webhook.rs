// --- File: crates/connect_stripe/src/webhook.rs ---
//! Connect webhook events: signature check and indexing.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::info;

use crate::error::StripeError;
use crate::index::ConnectIndex;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ConnectEventData {
    /// The object the event is about; its shape depends on the event type.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub object: serde_json::Value,
}

/// A Stripe event delivered to a Connect endpoint.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ConnectEvent {
    pub id: String,
    #[serde(default)]
    pub object: String, // "event"
    /// Connected account the event happened on.
    pub account: Option<String>,
    pub api_version: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ConnectEventData,
}

impl ConnectEvent {
    fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }
}

/// Verifies the `Stripe-Signature` header of a webhook request.
///
/// The header carries a timestamp `t` and one or more `v1` HMAC-SHA256
/// signatures of `"{t}.{payload}"`. Events older (or newer) than
/// `tolerance_secs` are refused.
pub fn verify_stripe_signature(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), StripeError> {
    verify_stripe_signature_at(
        payload_bytes,
        sig_header,
        secret,
        tolerance_secs,
        Utc::now().timestamp(),
    )
}

fn verify_stripe_signature_at(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), StripeError> {
    let sig_header_value = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;

    let mut timestamp_str: Option<&str> = None;
    let mut v1_signatures_hex: Vec<&str> = Vec::new();
    for item in sig_header_value.split(',') {
        if let Some((key, value)) = item.trim().split_once('=') {
            match key {
                "t" => timestamp_str = Some(value),
                "v1" => v1_signatures_hex.push(value),
                _ => {} // v0 and future schemes
            }
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp_str.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError(
            "Invalid timestamp format in Stripe-Signature".to_string(),
        )
    })?;
    if v1_signatures_hex.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }
    if (now - parsed_timestamp).abs() > tolerance_secs {
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload_bytes);

    // Each v1 entry is checked in constant time by the MAC itself.
    let matched = v1_signatures_hex.iter().any(|provided| {
        hex::decode(provided)
            .map(|signature| mac.clone().verify_slice(&signature).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(StripeError::WebhookSignatureError(
            "Signature mismatch".to_string(),
        ))
    }
}

/// Records payouts and persons created outside the dashboard, so later
/// `payoutid` / `personid` lookups find their account.
pub async fn process_connect_event(
    event: &ConnectEvent,
    index: &dyn ConnectIndex,
) -> Result<(), StripeError> {
    let event_type = event.event_type.as_str();
    let indexed = event_type.starts_with("payout.") || event_type.starts_with("person.");
    if !indexed {
        info!("[Connect Webhook] Ignoring event type: {}", event_type);
        return Ok(());
    }

    let stripe_id = event.account.as_deref().ok_or_else(|| {
        StripeError::WebhookProcessingError(format!("{} without connected account", event.id))
    })?;
    let object_id = event.object_id().ok_or_else(|| {
        StripeError::WebhookProcessingError(format!("{} without object id", event.id))
    })?;

    match event_type {
        "person.deleted" => {
            index.remove_person(object_id).await;
            info!("[Connect Webhook] Unindexed person {}", object_id);
        }
        "person.created" | "person.updated" => {
            index.add_person(stripe_id, object_id).await;
            info!("[Connect Webhook] Indexed person {} on {}", object_id, stripe_id);
        }
        _ if event_type.starts_with("payout.") => {
            index.add_payout(stripe_id, object_id).await;
            info!("[Connect Webhook] Indexed payout {} on {}", object_id, stripe_id);
        }
        _ => info!("[Connect Webhook] Ignoring event type: {}", event_type),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &str, timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_700_000_000);
        assert!(verify_stripe_signature_at(
            payload.as_bytes(),
            Some(&header),
            SECRET,
            300,
            1_700_000_100
        )
        .is_ok());
    }

    #[test]
    fn test_signature_failures() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_700_000_000);

        let tampered = verify_stripe_signature_at(b"{}", Some(&header), SECRET, 300, 1_700_000_000);
        assert!(matches!(tampered, Err(StripeError::WebhookSignatureError(_))));

        let stale =
            verify_stripe_signature_at(payload.as_bytes(), Some(&header), SECRET, 300, 1_700_001_000);
        assert!(matches!(stale, Err(StripeError::WebhookSignatureError(_))));

        let missing = verify_stripe_signature_at(payload.as_bytes(), None, SECRET, 300, 0);
        assert!(matches!(missing, Err(StripeError::WebhookSignatureError(_))));

        let no_v1 = verify_stripe_signature_at(
            payload.as_bytes(),
            Some("t=1700000000"),
            SECRET,
            300,
            1_700_000_000,
        );
        assert!(matches!(no_v1, Err(StripeError::WebhookSignatureError(_))));
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let payload = r#"{"id":"evt_1"}"#;
        let valid = sign(payload, 1_700_000_000);
        let valid_v1 = valid.split("v1=").nth(1).unwrap();

        // Secret rotation sends one v1 entry per secret.
        let rotated = format!("t=1700000000,v1={},v1={}", "00".repeat(32), valid_v1);
        assert!(verify_stripe_signature_at(
            payload.as_bytes(),
            Some(&rotated),
            SECRET,
            300,
            1_700_000_000
        )
        .is_ok());

        let not_hex = "t=1700000000,v1=zz-not-hex";
        let result =
            verify_stripe_signature_at(payload.as_bytes(), Some(not_hex), SECRET, 300, 1_700_000_000);
        assert!(matches!(result, Err(StripeError::WebhookSignatureError(_))));

        let truncated = format!("t=1700000000,v1={}", &valid_v1[..32]);
        let result = verify_stripe_signature_at(
            payload.as_bytes(),
            Some(&truncated),
            SECRET,
            300,
            1_700_000_000,
        );
        assert!(matches!(result, Err(StripeError::WebhookSignatureError(_))));
    }

    fn event(event_type: &str, object_id: &str) -> ConnectEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "object": "event",
            "account": "acct_1",
            "created": 1_700_000_000,
            "type": event_type,
            "data": { "object": { "id": object_id } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_events_update_index() {
        let index = MemoryIndex::new();
        process_connect_event(&event("payout.paid", "po_1"), &index)
            .await
            .unwrap();
        process_connect_event(&event("person.created", "person_1"), &index)
            .await
            .unwrap();
        assert_eq!(index.stripe_id_for_payout("po_1").await.as_deref(), Some("acct_1"));
        assert_eq!(
            index.stripe_id_for_person("person_1").await.as_deref(),
            Some("acct_1")
        );

        process_connect_event(&event("person.deleted", "person_1"), &index)
            .await
            .unwrap();
        assert_eq!(index.stripe_id_for_person("person_1").await, None);

        process_connect_event(&event("account.updated", "acct_1"), &index)
            .await
            .unwrap();
    }
}
