#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;
    use std::sync::Arc;

    use crate::client::MockConnectApi;
    use crate::error::StripeError;
    use crate::index::{ConnectIndex, MemoryIndex};
    use crate::routes::routes;
    use crate::test_support::*;

    fn has_param(params: &[(String, String)], key: &str, value: &str) -> bool {
        params.iter().any(|(k, v)| k == key && v == value)
    }

    fn owned_company(extra: serde_json::Value) -> MockConnectApi {
        let mut api = MockConnectApi::new();
        api.expect_retrieve_account()
            .returning(move |id| Ok(account(id, "company", "DE", extra.clone())));
        api
    }

    #[tokio::test]
    async fn test_requests_without_dashboard_account_are_rejected() {
        let router = routes(state(MockConnectApi::new()));
        let (status, body) = send_json(
            router,
            empty(request("GET", "/api/user/connect/stripe-accounts", None)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "unauthorized");
    }

    #[tokio::test]
    async fn test_missing_stripeid() {
        let router = routes(state(MockConnectApi::new()));
        let (status, body) = send_json(
            router,
            empty(request("GET", "/api/user/connect/stripe-account", Some(OWNER))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-stripeid");
    }

    #[tokio::test]
    async fn test_other_accounts_are_forbidden() {
        let router = routes(state(owned_company(json!({}))));
        let (status, body) = send_json(
            router,
            empty(request(
                "GET",
                "/api/user/connect/stripe-account?stripeid=acct_1",
                Some(STRANGER),
            )),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "invalid-account");
    }

    #[tokio::test]
    async fn test_create_stripe_account_indexes_it() {
        let mut api = MockConnectApi::new();
        api.expect_create_account().times(1).returning(|params| {
            assert!(has_param(&params, "type", "custom"));
            assert!(has_param(&params, "country", "DE"));
            assert!(has_param(&params, "business_type", "company"));
            assert!(has_param(&params, "metadata[accountid]", OWNER));
            Ok(account("acct_new", "company", "DE", json!({})))
        });
        let index = Arc::new(MemoryIndex::new());
        let router = routes(state_with(api, index.clone(), config(10)));

        let (status, body) = send_json(
            router,
            json_body(
                request("POST", "/api/user/connect/create-stripe-account", Some(OWNER)),
                json!({ "type": "company", "country": "de" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "acct_new");
        assert_eq!(index.stripe_accounts(OWNER).await, vec!["acct_new".to_string()]);
    }

    #[tokio::test]
    async fn test_create_stripe_account_validates_type_and_country() {
        let router = routes(state(MockConnectApi::new()));
        let (_, body) = send_json(
            router.clone(),
            json_body(
                request("POST", "/api/user/connect/create-stripe-account", Some(OWNER)),
                json!({ "type": "partnership", "country": "DE" }),
            ),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-type");

        let (status, body) = send_json(
            router,
            json_body(
                request("POST", "/api/user/connect/create-stripe-account", Some(OWNER)),
                json!({ "type": "individual", "country": "JP" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-country");
    }

    #[tokio::test]
    async fn test_submitted_account_blocks_owner_changes() {
        let mut api = owned_company(submitted_metadata());
        api.expect_retrieve_person()
            .returning(|stripe_id, id| Ok(person(id, stripe_id, json!({ "owner": true }))));
        let index = Arc::new(MemoryIndex::new());
        index.add_person("acct_1", "person_1").await;
        let router = routes(state_with(api, index, config(10)));

        let (status, body) = send_json(
            router.clone(),
            json_body(
                request(
                    "POST",
                    "/api/user/connect/create-beneficial-owner?stripeid=acct_1",
                    Some(OWNER),
                ),
                json!({ "first_name": "Max" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-stripe-account");

        let (_, body) = send_json(
            router.clone(),
            empty(request(
                "DELETE",
                "/api/user/connect/delete-beneficial-owner?personid=person_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-stripe-account");

        let (_, body) = send_json(
            router,
            empty(request(
                "PATCH",
                "/api/user/connect/set-company-directors-submitted?stripeid=acct_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-stripe-account");
    }

    #[tokio::test]
    async fn test_provided_owners_are_closed_but_directors_stay_open() {
        let mut api = owned_company(json!({ "company": { "owners_provided": true } }));
        api.expect_update_account().times(1).returning(|id, params| {
            assert!(has_param(&params, "company[directors_provided]", "true"));
            Ok(account(id, "company", "DE", json!({})))
        });
        let router = routes(state(api));

        let (_, body) = send_json(
            router.clone(),
            empty(request(
                "PATCH",
                "/api/user/connect/set-beneficial-owners-submitted?stripeid=acct_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-stripe-account");

        let (status, _) = send_json(
            router,
            empty(request(
                "PATCH",
                "/api/user/connect/set-company-directors-submitted?stripeid=acct_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directors_unsupported_outside_europe() {
        let mut api = MockConnectApi::new();
        api.expect_retrieve_account()
            .returning(|id| Ok(account(id, "company", "US", json!({}))));
        let router = routes(state(api));
        let (_, body) = send_json(
            router,
            empty(request(
                "GET",
                "/api/user/connect/company-directors?stripeid=acct_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-stripe-account");
    }

    #[tokio::test]
    async fn test_first_missing_required_field_is_reported() {
        let router = routes(state(owned_company(json!({}))));
        let (status, body) = send_json(
            router,
            json_body(
                request(
                    "PATCH",
                    "/api/user/connect/update-company-registration?stripeid=acct_1",
                    Some(OWNER),
                ),
                json!({
                    "business_profile_mcc": "5734",
                    "business_profile_url": "https://example.com",
                    "company_name": "Beispiel GmbH",
                    "company_tax_id": "  ",
                    "company_phone": "+4930123456"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-company_tax_id");
    }

    #[tokio::test]
    async fn test_company_registration_is_forwarded() {
        let mut api = owned_company(json!({}));
        api.expect_update_account().times(1).returning(|id, params| {
            assert_eq!(id, "acct_1");
            assert!(has_param(&params, "business_profile[mcc]", "5734"));
            assert!(has_param(&params, "company[name]", "Beispiel GmbH"));
            assert!(has_param(&params, "company[address][postal_code]", "10115"));
            assert!(!params.iter().any(|(k, _)| k == "company[vat_id]"));
            Ok(account(id, "company", "DE", json!({})))
        });
        let router = routes(state(api));
        let (status, body) = send_json(
            router,
            json_body(
                request(
                    "PATCH",
                    "/api/user/connect/update-company-registration?stripeid=acct_1",
                    Some(OWNER),
                ),
                json!({
                    "business_profile_mcc": "5734",
                    "business_profile_url": "https://example.com",
                    "company_name": "Beispiel GmbH",
                    "company_tax_id": "DE123456789",
                    "company_phone": "+4930123456",
                    "company_address_line1": "Hauptstraße 1",
                    "company_address_city": "Berlin",
                    "company_address_postal_code": "10115"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "acct_1");
    }

    #[tokio::test]
    async fn test_stripe_param_errors_map_to_fields() {
        let mut api = owned_company(json!({}));
        api.expect_update_account().returning(|_, _| {
            Err(StripeError::ApiError {
                status_code: 400,
                message: "Invalid IBAN".to_string(),
                param: Some("external_account[account_number]".to_string()),
            })
        });
        let router = routes(state(api));
        let (status, body) = send_json(
            router,
            json_body(
                request(
                    "PATCH",
                    "/api/user/connect/update-payment-details?stripeid=acct_1",
                    Some(OWNER),
                ),
                json!({
                    "currency": "eur",
                    "country": "DE",
                    "account_holder_name": "Beispiel GmbH",
                    "account_holder_type": "company",
                    "iban": "DE00"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-iban");
    }

    #[tokio::test]
    async fn test_stripe_accounts_are_paged() {
        let mut api = MockConnectApi::new();
        api.expect_retrieve_account()
            .returning(|id| Ok(account(id, "individual", "DE", json!({}))));
        let index = Arc::new(MemoryIndex::new());
        for n in 0..12 {
            index.add_stripe_account(OWNER, &format!("acct_{}", n)).await;
        }
        let router = routes(state_with(api, index, config(5)));

        let (_, body) = send_json(
            router.clone(),
            empty(request("GET", "/api/user/connect/stripe-accounts", Some(OWNER))),
        )
        .await;
        assert_eq!(body.as_array().map(Vec::len), Some(5));
        assert_eq!(body[0]["id"], "acct_11");

        let (_, body) = send_json(
            router.clone(),
            empty(request(
                "GET",
                "/api/user/connect/stripe-accounts?offset=10",
                Some(OWNER),
            )),
        )
        .await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|a| a["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["acct_1", "acct_0"]);

        let (_, body) = send_json(
            router.clone(),
            empty(request(
                "GET",
                "/api/user/connect/stripe-accounts?all=true",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(body.as_array().map(Vec::len), Some(12));

        let (_, body) = send_json(
            router,
            empty(request("GET", "/api/user/connect/stripe-accounts-count", Some(OWNER))),
        )
        .await;
        assert_eq!(body, json!(12));
    }

    #[tokio::test]
    async fn test_submit_records_terms_acceptance() {
        let mut api = MockConnectApi::new();
        api.expect_retrieve_account()
            .returning(|id| Ok(account(id, "individual", "DE", with_bank_account())));
        api.expect_update_account().times(1).returning(|id, params| {
            assert!(has_param(&params, "tos_acceptance[ip]", "198.51.100.7"));
            assert!(params.iter().any(|(k, _)| k == "tos_acceptance[date]"));
            assert!(params.iter().any(|(k, _)| k == "metadata[submitted]"));
            Ok(account(id, "individual", "DE", submitted_metadata()))
        });
        let router = routes(state(api));
        let (status, _) = send_json(
            router,
            empty(
                request(
                    "PATCH",
                    "/api/user/connect/set-stripe-account-submitted?stripeid=acct_1",
                    Some(OWNER),
                )
                .header("x-forwarded-for", "198.51.100.7, 10.0.0.1"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_requires_payment_details_and_representative() {
        let mut api = MockConnectApi::new();
        api.expect_retrieve_account().returning(|id| {
            let extra = if id == "acct_paid" {
                with_bank_account()
            } else {
                json!({})
            };
            Ok(account(id, "company", "DE", extra))
        });
        api.expect_list_persons().returning(|_, _| Ok(Vec::new()));
        let router = routes(state(api));

        let (_, body) = send_json(
            router.clone(),
            empty(request(
                "PATCH",
                "/api/user/connect/set-stripe-account-submitted?stripeid=acct_1",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-payment-details");

        let (_, body) = send_json(
            router,
            empty(request(
                "PATCH",
                "/api/user/connect/set-stripe-account-submitted?stripeid=acct_paid",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-company-representative");
    }

    #[tokio::test]
    async fn test_payouts_of_other_accounts_are_forbidden() {
        let index = Arc::new(MemoryIndex::new());
        index.add_payout("acct_1", "po_1").await;
        let router = routes(state_with(owned_company(json!({})), index, config(10)));

        let (status, body) = send_json(
            router.clone(),
            empty(request("GET", "/api/user/connect/payout?payoutid=po_1", Some(STRANGER))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "invalid-account");

        let (_, body) = send_json(
            router,
            empty(request("GET", "/api/user/connect/payout?payoutid=po_9", Some(OWNER))),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-payoutid");
    }

    #[tokio::test]
    async fn test_country_specs() {
        let router = routes(state(MockConnectApi::new()));
        let (_, body) = send_json(
            router.clone(),
            empty(request("GET", "/api/user/connect/country-specs", Some(OWNER))),
        )
        .await;
        let countries = body.as_array().unwrap();
        assert!(countries.iter().any(|c| c["id"] == "DE" && c["company"] == true));
        assert!(!countries.iter().any(|c| c["id"] == "JP"));

        let (_, body) = send_json(
            router,
            empty(request(
                "GET",
                "/api/user/connect/country-spec?countryid=XX",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(error_code(&body), "invalid-countryid");
    }

    #[tokio::test]
    async fn test_administrator_routes() {
        let router = routes(state(owned_company(json!({}))));
        let (status, body) = send_json(
            router.clone(),
            empty(request(
                "GET",
                "/api/administrator/connect/stripe-accounts",
                Some(OWNER),
            )),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "invalid-account");

        let (status, body) = send_json(
            router,
            json_body(
                request(
                    "PATCH",
                    "/api/administrator/connect/set-stripe-account-rejected?stripeid=acct_1",
                    Some(STRANGER),
                )
                .header("x-account-administrator", "true"),
                json!({ "reason": "bogus" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "invalid-reason");
    }

    fn signed(payload: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[tokio::test]
    async fn test_webhook_indexes_payouts() {
        let index = Arc::new(MemoryIndex::new());
        let router = routes(state_with(MockConnectApi::new(), index.clone(), config(10)));
        let payload = json!({
            "id": "evt_1",
            "object": "event",
            "account": "acct_1",
            "created": 1_700_000_000,
            "type": "payout.created",
            "data": { "object": { "id": "po_1", "object": "payout" } }
        })
        .to_string();

        let (status, _) = send(
            router.clone(),
            request("POST", "/webhooks/connect/index-connect-data", None)
                .header("stripe-signature", "t=1,v1=00")
                .body(axum::body::Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(index.stripe_id_for_payout("po_1").await, None);

        let (status, _) = send(
            router,
            request("POST", "/webhooks/connect/index-connect-data", None)
                .header("stripe-signature", signed(&payload))
                .body(axum::body::Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            index.stripe_id_for_payout("po_1").await.as_deref(),
            Some("acct_1")
        );
    }

    #[tokio::test]
    async fn test_webhook_without_secret() {
        let router = routes(state_with(
            MockConnectApi::new(),
            Arc::new(MemoryIndex::new()),
            connect_config::AppConfig::default(),
        ));
        let (status, _) = send(
            router,
            request("POST", "/webhooks/connect/index-connect-data", None)
                .body(axum::body::Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
