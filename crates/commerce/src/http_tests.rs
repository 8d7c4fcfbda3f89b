// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! HTTP-level tests against a mock commerce/identity server
//!
//! Covers what the scripted API in `edge_case_tests` cannot: request shape
//! (form body, bearer header, JSON payloads), status handling and error
//! bodies.

use std::time::Duration;

use mockito::{Matcher, ServerGuard};
use serde_json::json;

use crate::auth::{authenticate, Credentials};
use crate::baskets::BasketManager;
use crate::client::CommerceClient;
use crate::config::CommerceConfig;
use crate::error::CommerceError;
use crate::models::{Basket, BasketItem, SubscriptionRequest};
use crate::subscriptions::SubscriptionService;

const TOKEN_BODY: &str = r#"{"access_token":"test-token","token_type":"Bearer","expires_in":3600}"#;

fn config(server: &ServerGuard) -> CommerceConfig {
    CommerceConfig::new(server.url(), server.url(), "client-id", "client-secret", 42)
}

async fn connect(server: &mut ServerGuard) -> CommerceClient {
    let _token = server
        .mock("POST", "/api/v1/oauth/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TOKEN_BODY)
        .create_async()
        .await;

    CommerceClient::configure(config(server)).await.unwrap()
}

fn request() -> SubscriptionRequest {
    SubscriptionRequest {
        friendly_name: "acme-sub".to_string(),
        principal_id: Some("user@acme.com".to_string()),
        po_number: "PO-1".to_string(),
        budget_code: "BC-1".to_string(),
        division_id: None,
    }
}

fn basket(id: i64) -> Basket {
    Basket {
        id,
        items: vec![BasketItem {
            id: 1,
            po_number: "PO-1".to_string(),
            principal_id: "user@acme.com".to_string(),
            budget_code: "BC-1".to_string(),
        }],
    }
}

fn order_body(subscription_id: Option<&str>) -> String {
    json!({
        "id": 200,
        "contractName": "Acme Contract",
        "createDate": "2024-05-01T10:00:00Z",
        "items": [{
            "subscriptionId": subscription_id,
            "poNumber": "PO-1",
            "friendlyName": "acme-sub",
            "principalId": "user@acme.com",
            "cloudSubscriptionId": null
        }]
    })
    .to_string()
}

const CHECKOUT_BODY: &str = r#"{"id":200,"items":[{"id":1,"poNumber":"PO-1","friendlyName":"acme-sub","principalId":"user@acme.com"}]}"#;

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_token_request_uses_client_credentials_form() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/api/v1/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(TOKEN_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = CommerceClient::configure(config(&server)).await.unwrap();

        token.assert_async().await;
        assert_eq!(client.token().access_token(), "test-token");
        assert_eq!(client.token().token_type, "Bearer");
        assert_eq!(client.token().expires_in, 3600);
        assert_eq!(client.contract_id(), 42);
    }

    #[tokio::test]
    async fn test_empty_credentials_make_no_request() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/api/v1/oauth/token")
            .expect(0)
            .create_async()
            .await;

        let mut cfg = config(&server);
        cfg.credentials = Credentials::new("client-id", "");
        let err = CommerceClient::configure(cfg).await.err().unwrap();
        assert!(matches!(err, CommerceError::Configuration(_)));

        let err = authenticate(
            &reqwest::Client::new(),
            &server.url(),
            &Credentials::new("", "client-secret"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CommerceError::Configuration(_)));

        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_token_request_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/oauth/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let err = CommerceClient::configure(config(&server)).await.err().unwrap();

        match err {
            CommerceError::Auth { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid_client"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/oauth/token")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = CommerceClient::configure(config(&server)).await.err().unwrap();
        assert!(matches!(
            err,
            CommerceError::Decode {
                context: "token",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_identity_host() {
        let config = CommerceConfig::new(
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
            "client-id",
            "client-secret",
            42,
        );

        let err = CommerceClient::configure(config).await.err().unwrap();
        assert!(matches!(err, CommerceError::Transport(_)));
    }
}

#[cfg(test)]
mod order_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_order_sends_bearer_and_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let lookup = server
            .mock("GET", "/api/v2/contracts/42/orders/200")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(order_body(Some("sub-abc")))
            .expect(2)
            .create_async()
            .await;

        let first = client.get_order("200").await.unwrap();
        let second = client.get_order("200").await.unwrap();

        lookup.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.id, 200);
        assert_eq!(first.contract_name, "Acme Contract");
        assert_eq!(first.subscription_id(), Some("sub-abc"));
    }

    #[tokio::test]
    async fn test_pending_order_has_blank_subscription() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("GET", "/api/v2/contracts/42/orders/200")
            .with_status(200)
            .with_body(order_body(None))
            .create_async()
            .await;

        let order = client.get_order("200").await.unwrap();
        assert!(!order.is_provisioned());
        assert_eq!(order.items[0].subscription_id, "");
    }

    #[tokio::test]
    async fn test_get_order_non_200_is_query_error() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("GET", "/api/v2/contracts/42/orders/999")
            .with_status(404)
            .with_body("order 999 not found")
            .create_async()
            .await;

        let err = client.get_order("999").await.unwrap_err();

        match err {
            CommerceError::Query { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "order 999 not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_order_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("GET", "/api/v2/contracts/42/orders/200")
            .with_status(200)
            .with_body(r#"{"id":"not-a-number"}"#)
            .create_async()
            .await;

        let err = client.get_order("200").await.unwrap_err();
        assert!(matches!(
            err,
            CommerceError::Decode {
                context: "order",
                ..
            }
        ));
    }
}

#[cfg(test)]
mod checkout_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_accepts_200_and_202_alike() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets/100/checkout")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(CHECKOUT_BODY)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets/101/checkout")
            .match_header("authorization", "Bearer test-token")
            .with_status(202)
            .with_body(CHECKOUT_BODY)
            .create_async()
            .await;

        let ok = client.checkout_basket(&basket(100)).await.unwrap();
        let accepted = client.checkout_basket(&basket(101)).await.unwrap();

        assert_eq!(ok, accepted);
        assert_eq!(ok.id, 200);
        assert_eq!(ok.items[0].friendly_name, "acme-sub");
    }

    #[tokio::test]
    async fn test_checkout_other_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets/100/checkout")
            .with_status(409)
            .with_body("basket already checked out")
            .create_async()
            .await;

        let err = client.checkout_basket(&basket(100)).await.unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("basket already checked out"));
        assert!(matches!(err, CommerceError::Checkout { .. }));
    }

    #[tokio::test]
    async fn test_checkout_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets/100/checkout")
            .with_status(202)
            .with_body("<html>accepted</html>")
            .create_async()
            .await;

        let err = client.checkout_basket(&basket(100)).await.unwrap_err();

        assert!(matches!(
            err,
            CommerceError::Decode {
                context: "checkout",
                ..
            }
        ));
    }
}

#[cfg(test)]
mod basket_tests {
    use super::*;

    #[tokio::test]
    async fn test_basket_payload_shape() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let create = server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .match_header("authorization", "Bearer test-token")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "quantity": 1,
                "friendlyName": "acme-sub",
                "productId": "ENTITLEMENT",
                "skuId": "ENTITLEMENT",
                "principalId": "user@acme.com",
                "priceId": 24492277,
                "poNumber": "PO-1",
                "billingFrequency": "monthly",
                "term": "Perpetual",
                "divisionId": null,
                "budgetCode": "BC-1"
            })))
            .with_status(200)
            .with_body(r#"{"id":100,"items":[{"id":1,"poNumber":"PO-1","principalId":"user@acme.com","budgetCode":"BC-1"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let basket = BasketManager::new(&client)
            .create_basket(&request())
            .await
            .unwrap();

        create.assert_async().await;
        assert_eq!(basket.id, 100);
        assert_eq!(basket.items.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_basket_never_deletes() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;
        let delete = server
            .mock("POST", "/api/v1/CloudDashboard/DeleteBasketItem")
            .expect(0)
            .create_async()
            .await;

        let err = BasketManager::new(&client)
            .create_basket(&request())
            .await
            .unwrap_err();

        delete.assert_async().await;
        match err {
            CommerceError::Basket { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_items_deleted_one_call_each() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let create = server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .with_status(200)
            .with_body(r#"{"id":100,"items":[{"id":7},{"id":8}]}"#)
            .expect(1)
            .create_async()
            .await;
        let delete_7 = server
            .mock("POST", "/api/v1/CloudDashboard/DeleteBasketItem")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(json!({ "basketItemId": 7 })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let delete_8 = server
            .mock("POST", "/api/v1/CloudDashboard/DeleteBasketItem")
            .match_body(Matcher::Json(json!({ "basketItemId": 8 })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let err = BasketManager::new(&client)
            .with_max_retries(0)
            .create_basket(&request())
            .await
            .unwrap_err();

        create.assert_async().await;
        delete_7.assert_async().await;
        delete_8.assert_async().await;
        assert!(matches!(
            err,
            CommerceError::BasketConflictExceeded { attempts: 1 }
        ));
    }

    #[tokio::test]
    async fn test_failed_delete_reports_item() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;

        server
            .mock("POST", "/api/v1/CloudDashboard/DeleteBasketItem")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let err = client.delete_basket_item(7).await.unwrap_err();

        match err {
            CommerceError::BasketCleanup {
                item_id,
                status,
                body,
            } => {
                assert_eq!(item_id, 7);
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_basket_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .with_status(200)
            .with_body(r#"{"id":100,"items":"#)
            .create_async()
            .await;
        let delete = server
            .mock("POST", "/api/v1/CloudDashboard/DeleteBasketItem")
            .expect(0)
            .create_async()
            .await;

        let err = BasketManager::new(&client)
            .create_basket(&request())
            .await
            .unwrap_err();

        delete.assert_async().await;
        assert!(matches!(
            err,
            CommerceError::Decode {
                context: "basket",
                ..
            }
        ));
    }
}

#[cfg(test)]
mod transport_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_server_hits_request_timeout() {
        let mut identity = mockito::Server::new_async().await;
        identity
            .mock("POST", "/api/v1/oauth/token")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .create_async()
            .await;

        // Accepts connections and never answers
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let commerce_url = format!("http://{}", silent.local_addr().unwrap());
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = silent.accept().await {
                open.push(socket);
            }
        });

        let config = CommerceConfig::new(
            identity.url(),
            commerce_url,
            "client-id",
            "client-secret",
            42,
        )
        .with_request_timeout(Duration::from_millis(200));
        let client = CommerceClient::configure(config).await.unwrap();

        let err = client.get_order("200").await.unwrap_err();

        match err {
            CommerceError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unserializable_body_is_encode_error() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let baskets = server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .expect(0)
            .create_async()
            .await;

        // JSON object keys must be strings
        let mut body = std::collections::BTreeMap::new();
        body.insert((1, 2), "item");
        let err = client
            .post_json(&client.contract_endpoint("/baskets"), &body)
            .await
            .unwrap_err();

        baskets.assert_async().await;
        assert!(matches!(err, CommerceError::Encode { context: "json", .. }));
        assert!(err.to_string().starts_with("failed to encode json request body"));
    }

    #[tokio::test]
    async fn test_order_id_stays_one_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let elsewhere = server
            .mock("GET", Matcher::Regex("^/api/v2/(contracts/)?x$".to_string()))
            .expect(0)
            .create_async()
            .await;

        let err = client.get_order("..").await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidOrderId(_)));

        let _ = client.get_order("1/../../x").await;
        elsewhere.assert_async().await;
    }
}

#[cfg(test)]
mod provisioning_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let mut server = mockito::Server::new_async().await;
        let client = connect(&mut server).await;
        let create = server
            .mock("POST", "/api/v2/contracts/42/baskets")
            .with_status(200)
            .with_body(r#"{"id":100,"items":[{"id":1,"poNumber":"PO-1","principalId":"user@acme.com","budgetCode":"BC-1"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let checkout = server
            .mock("POST", "/api/v2/contracts/42/baskets/100/checkout")
            .with_status(202)
            .with_body(CHECKOUT_BODY)
            .expect(1)
            .create_async()
            .await;
        let lookup = server
            .mock("GET", "/api/v2/contracts/42/orders/200")
            .with_status(200)
            .with_body(order_body(Some("sub-abc")))
            .expect(1)
            .create_async()
            .await;

        let service = SubscriptionService::new(client);
        let order = service.create_subscription(&request()).await.unwrap();

        create.assert_async().await;
        checkout.assert_async().await;
        lookup.assert_async().await;
        assert_eq!(order.id, 200);
        assert_eq!(order.items[0].subscription_id, "sub-abc");
    }
}
