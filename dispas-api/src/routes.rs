//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Key generation
        .route("/api/v1/keys/generate", post(handlers::generate_keys))

        // Meta-address registry
        .route("/api/v1/registry/register", post(handlers::register))
        .route("/api/v1/registry/:identity", get(handlers::lookup))

        // Stealth operations
        .route("/api/v1/stealth/create", post(handlers::create_stealth))
        .route("/api/v1/stealth/send", post(handlers::send_stealth))
        .route("/api/v1/stealth/scan", post(handlers::scan_payments))

        // Announcement log
        .route(
            "/api/v1/announcements",
            get(handlers::list_announcements).post(handlers::publish_announcement),
        )

        // Distribution
        .route("/api/v1/distribute", post(handlers::distribute))
        .route("/api/v1/balances/:account", get(handlers::balance))

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::dto::*;
    use crate::state::ApiConfig;
    use dispas_core::types::DistributionReceipt;
    use dispas_core::{Address, U256};

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(ApiConfig::default()))
    }

    async fn call(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn parse<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = test_state();
        let (status, body) = call(&state, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = parse(body);
        assert_eq!(health.status, "ok");
        assert_eq!(health.announcements_count, 0);
    }

    #[tokio::test]
    async fn test_generate_register_lookup() {
        let state = test_state();

        let (status, body) = call(&state, "POST", "/api/v1/keys/generate", None).await;
        assert_eq!(status, StatusCode::OK);
        let keys: GenerateKeysResponse = parse(body);
        assert!(keys.meta_address.starts_with("st:eth:0x"));

        let register = json!({
            "caller": addr(0xb0),
            "identity": { "kind": "eoa", "address": addr(0xb0) },
            "meta_address": keys.meta_address,
        });
        let (status, body) = call(&state, "POST", "/api/v1/registry/register", Some(register)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "registered");

        let uri = format!("/api/v1/registry/{}", addr(0xb0));
        let (status, body) = call(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let found: LookupResponse = parse(body);
        assert_eq!(found.meta_address, keys.meta_address);
        assert_eq!(found.spending_pk, keys.spending_pk);
    }

    #[tokio::test]
    async fn test_register_for_foreign_account_is_forbidden() {
        let state = test_state();
        let (_, body) = call(&state, "POST", "/api/v1/keys/generate", None).await;
        let keys: GenerateKeysResponse = parse(body);

        let register = json!({
            "caller": addr(0x01),
            "identity": { "kind": "eoa", "address": addr(0xb0) },
            "meta_address": keys.meta_address,
        });
        let (status, body) = call(&state, "POST", "/api/v1/registry/register", Some(register)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "NotAuthorized");
    }

    #[tokio::test]
    async fn test_lookup_unknown_identity() {
        let state = test_state();
        let uri = format!("/api/v1/registry/{}", addr(0x42));
        let (status, _) = call(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_publish_and_scan() {
        let state = test_state();
        let (_, body) = call(&state, "POST", "/api/v1/keys/generate", None).await;
        let keys: GenerateKeysResponse = parse(body);

        let create = json!({
            "meta_address": keys.meta_address,
            "amount": U256::from(1_000u64),
            "publish": true,
        });
        let (status, body) = call(&state, "POST", "/api/v1/stealth/create", Some(create)).await;
        assert_eq!(status, StatusCode::OK);
        let created: CreateStealthResponse = parse(body);
        assert_eq!(created.sequence, Some(1));

        // A second payment, appended through the announcements endpoint.
        let create = json!({ "meta_address": keys.meta_address });
        let (_, body) = call(&state, "POST", "/api/v1/stealth/create", Some(create)).await;
        let second: CreateStealthResponse = parse(body);
        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/announcements",
            Some(serde_json::to_value(&second.announcement).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sequence"], 2);

        let scan = json!({ "viewing_sk": keys.viewing_sk, "spending_pk": keys.spending_pk });
        let (status, body) = call(&state, "POST", "/api/v1/stealth/scan", Some(scan)).await;
        assert_eq!(status, StatusCode::OK);
        let result: ScanResponse = parse(body);

        assert_eq!(result.stats.total_scanned, 2);
        let addresses: Vec<Address> = result.discoveries.iter().map(|d| d.stealth_address).collect();
        assert_eq!(addresses, vec![created.stealth_address, second.stealth_address]);
        assert_eq!(result.discoveries[0].amount, Some(U256::from(1_000u64)));
        assert_eq!(result.discoveries[1].amount, None);
    }

    #[tokio::test]
    async fn test_list_announcements_window() {
        let state = test_state();
        let (_, body) = call(&state, "POST", "/api/v1/keys/generate", None).await;
        let keys: GenerateKeysResponse = parse(body);
        for _ in 0..3 {
            let create = json!({ "meta_address": keys.meta_address, "publish": true });
            call(&state, "POST", "/api/v1/stealth/create", Some(create)).await;
        }

        let (status, body) = call(&state, "GET", "/api/v1/announcements?from=2&to=3", None).await;
        assert_eq!(status, StatusCode::OK);
        let list: ListAnnouncementsResponse = parse(body);
        assert_eq!(list.total, 3);
        let sequences: Vec<u64> = list.announcements.iter().map(|a| a.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
        assert_eq!(list.next, None);
    }

    #[tokio::test]
    async fn test_create_needs_exactly_one_recipient() {
        let state = test_state();
        let (status, _) = call(&state, "POST", "/api/v1/stealth/create", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_distribute_and_balances() {
        let state = test_state();
        state.ledger.set_balance(addr(0xfa), U256::from(100u64));

        let request = json!({
            "caller": addr(0xfa),
            "payer": { "kind": "eoa", "address": addr(0xfa) },
            "value": U256::from(30u64),
            "payments": [
                { "recipient": { "kind": "eoa", "address": addr(0x0a) }, "amount": U256::from(10u64) },
                { "recipient": { "kind": "eoa", "address": addr(0x0b) }, "amount": U256::from(20u64) },
            ],
            "nonce": "run-1",
        });
        let (status, body) = call(&state, "POST", "/api/v1/distribute", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        let receipt: DistributionReceipt = parse(body);
        assert_eq!(receipt.total_distributed, U256::from(30u64));

        let uri = format!("/api/v1/balances/{}", addr(0x0b));
        let (_, body) = call(&state, "GET", &uri, None).await;
        let balance: BalanceResponse = parse(body);
        assert_eq!(balance.balance, U256::from(20u64));
    }

    #[tokio::test]
    async fn test_distribute_error_carries_code() {
        let state = test_state();
        state.ledger.set_balance(addr(0xfa), U256::from(100u64));

        let request = json!({
            "caller": addr(0xfa),
            "payer": { "kind": "eoa", "address": addr(0xfa) },
            "value": U256::from(15u64),
            "payments": [
                { "recipient": { "kind": "eoa", "address": addr(0x0a) }, "amount": U256::from(10u64) },
                { "recipient": { "kind": "eoa", "address": addr(0x0b) }, "amount": U256::from(10u64) },
            ],
        });
        let (status, body) = call(&state, "POST", "/api/v1/distribute", Some(request)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "Dispas__InsufficientValue");
        assert_eq!(state.ledger.balance(&addr(0xfa)), U256::from(100u64));
    }

    #[tokio::test]
    async fn test_distribute_from_foreign_payer_is_forbidden() {
        let state = test_state();
        state.ledger.set_balance(addr(0xfa), U256::from(100u64));

        let request = json!({
            "caller": addr(0x66),
            "payer": { "kind": "eoa", "address": addr(0xfa) },
            "value": U256::from(100u64),
            "payments": [
                { "recipient": { "kind": "eoa", "address": addr(0x66) }, "amount": U256::from(100u64) },
            ],
        });
        let (status, body) = call(&state, "POST", "/api/v1/distribute", Some(request)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "NotAuthorized");
        assert_eq!(state.ledger.balance(&addr(0xfa)), U256::from(100u64));
        assert_eq!(state.ledger.balance(&addr(0x66)), U256::ZERO);
    }

    #[tokio::test]
    async fn test_stealth_send_to_registered_identity() {
        let state = test_state();
        let (_, body) = call(&state, "POST", "/api/v1/keys/generate", None).await;
        let keys: GenerateKeysResponse = parse(body);
        let register = json!({
            "caller": addr(0xb0),
            "identity": { "kind": "eoa", "address": addr(0xb0) },
            "meta_address": keys.meta_address,
        });
        call(&state, "POST", "/api/v1/registry/register", Some(register)).await;
        state.ledger.set_balance(addr(0xa1), U256::from(50u64));

        let send = json!({
            "caller": addr(0xa1),
            "from": { "kind": "eoa", "address": addr(0xa1) },
            "to": { "kind": "eoa", "address": addr(0xb0) },
            "amount": U256::from(50u64),
        });
        let (status, body) = call(&state, "POST", "/api/v1/stealth/send", Some(send)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event"]["sequence"], 1);

        let overdraw = json!({
            "caller": addr(0xa1),
            "from": { "kind": "eoa", "address": addr(0xa1) },
            "to": { "kind": "eoa", "address": addr(0xb0) },
            "amount": U256::from(1u64),
        });
        let (status, body) = call(&state, "POST", "/api/v1/stealth/send", Some(overdraw)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "InsufficientBalance");
    }
}
