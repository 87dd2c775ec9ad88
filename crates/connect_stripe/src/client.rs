// --- File: crates/connect_stripe/src/client.rs ---
//! Calls to the Stripe Connect API.
//!
//! `ConnectApi` is the seam route handlers depend on; `StripeConnectClient`
//! implements it over the shared reqwest client.

use async_trait::async_trait;
use connect_common::HTTP_CLIENT;
use connect_config::StripeConfig;
use reqwest::{multipart, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::error::StripeError;
use crate::fields::PersonRole;
use crate::models::{CountrySpec, FileUpload, Payout, Person, StripeAccount, StripeFile, StripeList};

/// Form-encoded Stripe parameters, in the order they are sent.
pub type Params = Vec<(String, String)>;

/// Stripe's maximum page size for list endpoints.
const LIST_PAGE_LIMIT: &str = "100";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectApi: Send + Sync {
    async fn create_account(&self, params: Params) -> Result<StripeAccount, StripeError>;

    async fn retrieve_account(&self, stripe_id: &str) -> Result<StripeAccount, StripeError>;

    async fn update_account(
        &self,
        stripe_id: &str,
        params: Params,
    ) -> Result<StripeAccount, StripeError>;

    async fn delete_account(&self, stripe_id: &str) -> Result<(), StripeError>;

    async fn reject_account(
        &self,
        stripe_id: &str,
        reason: &str,
    ) -> Result<StripeAccount, StripeError>;

    async fn list_persons(
        &self,
        stripe_id: &str,
        role: PersonRole,
    ) -> Result<Vec<Person>, StripeError>;

    async fn create_person(&self, stripe_id: &str, params: Params) -> Result<Person, StripeError>;

    async fn retrieve_person(&self, stripe_id: &str, person_id: &str)
        -> Result<Person, StripeError>;

    async fn update_person(
        &self,
        stripe_id: &str,
        person_id: &str,
        params: Params,
    ) -> Result<Person, StripeError>;

    async fn delete_person(&self, stripe_id: &str, person_id: &str) -> Result<(), StripeError>;

    async fn list_payouts(&self, stripe_id: &str) -> Result<Vec<Payout>, StripeError>;

    async fn retrieve_payout(&self, stripe_id: &str, payout_id: &str)
        -> Result<Payout, StripeError>;

    async fn retrieve_country_spec(&self, country: &str) -> Result<CountrySpec, StripeError>;

    /// Uploads a verification document on behalf of the connected account and
    /// returns the file id to reference in account or person parameters.
    async fn upload_file(
        &self,
        stripe_id: &str,
        upload: FileUpload,
        purpose: &str,
    ) -> Result<StripeFile, StripeError>;
}

/// `ConnectApi` over Stripe's REST API.
#[derive(Debug, Clone)]
pub struct StripeConnectClient {
    secret_key: String,
    api_base: String,
    files_base: String,
    api_version: Option<String>,
}

impl StripeConnectClient {
    pub fn from_config(config: &StripeConfig) -> Result<Self, StripeError> {
        let secret_key = config
            .secret_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(StripeError::ConfigError)?;
        Ok(Self {
            secret_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            files_base: config.files_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.basic_auth(&self.secret_key, None::<&str>);
        match &self.api_version {
            Some(version) => builder.header("Stripe-Version", version),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        connected_account: Option<&str>,
    ) -> Result<T, StripeError> {
        let url = self.url(path);
        info!("[Stripe Connect] GET {}", url);
        let mut builder = self.authorize(HTTP_CLIENT.get(&url)).query(query);
        if let Some(account) = connected_account {
            builder = builder.header("Stripe-Account", account);
        }
        send(builder).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        idempotent: bool,
    ) -> Result<T, StripeError> {
        let url = self.url(path);
        info!("[Stripe Connect] POST {} ({} params)", url, params.len());
        let mut builder = self.authorize(HTTP_CLIENT.post(&url)).form(params);
        if idempotent {
            builder = builder.header("Idempotency-Key", Uuid::new_v4().to_string());
        }
        send(builder).await
    }

    async fn delete(&self, path: &str) -> Result<(), StripeError> {
        let url = self.url(path);
        info!("[Stripe Connect] DELETE {}", url);
        let _: serde_json::Value = send(self.authorize(HTTP_CLIENT.delete(&url))).await?;
        Ok(())
    }

    /// Follows `has_more` / `starting_after` until the list is exhausted.
    async fn list_all<T>(
        &self,
        path: &str,
        filters: &[(&str, &str)],
        connected_account: Option<&str>,
        id_of: fn(&T) -> &str,
    ) -> Result<Vec<T>, StripeError>
    where
        T: DeserializeOwned + Send,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: StripeList<T> = {
                let mut query: Vec<(&str, &str)> = filters.to_vec();
                query.push(("limit", LIST_PAGE_LIMIT));
                if let Some(after) = cursor.as_deref() {
                    query.push(("starting_after", after));
                }
                self.get(path, &query, connected_account).await?
            };
            let next = if page.has_more {
                page.data.last().map(|item| id_of(item).to_string())
            } else {
                None
            };
            items.extend(page.data);
            match next {
                Some(after) => cursor = Some(after),
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl ConnectApi for StripeConnectClient {
    async fn create_account(&self, params: Params) -> Result<StripeAccount, StripeError> {
        self.post("accounts", &params, true).await
    }

    async fn retrieve_account(&self, stripe_id: &str) -> Result<StripeAccount, StripeError> {
        self.get(&format!("accounts/{}", stripe_id), &[], None).await
    }

    async fn update_account(
        &self,
        stripe_id: &str,
        params: Params,
    ) -> Result<StripeAccount, StripeError> {
        self.post(&format!("accounts/{}", stripe_id), &params, false)
            .await
    }

    async fn delete_account(&self, stripe_id: &str) -> Result<(), StripeError> {
        self.delete(&format!("accounts/{}", stripe_id)).await
    }

    async fn reject_account(
        &self,
        stripe_id: &str,
        reason: &str,
    ) -> Result<StripeAccount, StripeError> {
        let params = vec![("reason".to_string(), reason.to_string())];
        self.post(&format!("accounts/{}/reject", stripe_id), &params, false)
            .await
    }

    async fn list_persons(
        &self,
        stripe_id: &str,
        role: PersonRole,
    ) -> Result<Vec<Person>, StripeError> {
        let filter = format!("relationship[{}]", role.relationship());
        self.list_all(
            &format!("accounts/{}/persons", stripe_id),
            &[(filter.as_str(), "true")],
            None,
            person_id,
        )
        .await
    }

    async fn create_person(&self, stripe_id: &str, params: Params) -> Result<Person, StripeError> {
        self.post(&format!("accounts/{}/persons", stripe_id), &params, true)
            .await
    }

    async fn retrieve_person(
        &self,
        stripe_id: &str,
        person_id: &str,
    ) -> Result<Person, StripeError> {
        self.get(
            &format!("accounts/{}/persons/{}", stripe_id, person_id),
            &[],
            None,
        )
        .await
    }

    async fn update_person(
        &self,
        stripe_id: &str,
        person_id: &str,
        params: Params,
    ) -> Result<Person, StripeError> {
        self.post(
            &format!("accounts/{}/persons/{}", stripe_id, person_id),
            &params,
            false,
        )
        .await
    }

    async fn delete_person(&self, stripe_id: &str, person_id: &str) -> Result<(), StripeError> {
        self.delete(&format!("accounts/{}/persons/{}", stripe_id, person_id))
            .await
    }

    async fn list_payouts(&self, stripe_id: &str) -> Result<Vec<Payout>, StripeError> {
        self.list_all("payouts", &[], Some(stripe_id), payout_id)
            .await
    }

    async fn retrieve_payout(
        &self,
        stripe_id: &str,
        payout_id: &str,
    ) -> Result<Payout, StripeError> {
        self.get(&format!("payouts/{}", payout_id), &[], Some(stripe_id))
            .await
    }

    async fn retrieve_country_spec(&self, country: &str) -> Result<CountrySpec, StripeError> {
        self.get(&format!("country_specs/{}", country), &[], None)
            .await
    }

    async fn upload_file(
        &self,
        stripe_id: &str,
        upload: FileUpload,
        purpose: &str,
    ) -> Result<StripeFile, StripeError> {
        let url = format!("{}/v1/files", self.files_base);
        info!(
            "[Stripe Connect] Uploading {} ({} bytes) for {}",
            upload.field,
            upload.bytes.len(),
            stripe_id
        );
        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);
        let builder = self
            .authorize(HTTP_CLIENT.post(&url))
            .header("Stripe-Account", stripe_id)
            .multipart(form);
        send(builder).await
    }
}

fn person_id(person: &Person) -> &str {
    &person.id
}

fn payout_id(payout: &Payout) -> &str {
    &payout.id
}

/// Sends the request and decodes either the object or Stripe's error body.
async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, StripeError> {
    let response = builder.send().await?;
    let status = response.status();
    let body_text = response.text().await?;

    info!("[Stripe Connect] Stripe API response status: {}", status);

    if status.is_success() {
        Ok(serde_json::from_str(&body_text)?)
    } else {
        let (message, param) = parse_error_body(&body_text);
        info!(
            "[Stripe Connect] Stripe API request failed with HTTP status: {}. Message: {}",
            status, message
        );
        Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message,
            param,
        })
    }
}

/// Pulls `error.message` and `error.param` out of a Stripe error body.
fn parse_error_body(body_text: &str) -> (String, Option<String>) {
    match serde_json::from_str::<serde_json::Value>(body_text) {
        Ok(json_body) => {
            let error = json_body.get("error");
            let message = error
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or(body_text)
                .to_string();
            let param = error
                .and_then(|e| e.get("param"))
                .and_then(|p| p.as_str())
                .map(str::to_string);
            (message, param)
        }
        Err(_) => (body_text.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body() {
        let (message, param) = parse_error_body(
            r#"{"error":{"type":"invalid_request_error","message":"Invalid tax id","param":"company[tax_id]"}}"#,
        );
        assert_eq!(message, "Invalid tax id");
        assert_eq!(param.as_deref(), Some("company[tax_id]"));

        let (message, param) = parse_error_body("Bad Gateway");
        assert_eq!(message, "Bad Gateway");
        assert!(param.is_none());
    }

    #[test]
    fn test_client_requires_secret_key() {
        let config = StripeConfig::default();
        assert!(matches!(
            StripeConnectClient::from_config(&config),
            Err(StripeError::ConfigError)
        ));

        let config = StripeConfig {
            secret_key: Some("sk_test_123".to_string()),
            api_base: "https://api.stripe.com/".to_string(),
            ..StripeConfig::default()
        };
        let client = StripeConnectClient::from_config(&config).unwrap();
        assert_eq!(client.url("accounts"), "https://api.stripe.com/v1/accounts");
    }
}
