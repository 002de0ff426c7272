//! Backend HTTP clients against a mock server.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic

use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::types::{
    OrderId, OrderRequest, OrderService, PaymentVerifier, RegistrationData, ServiceError,
    TicketType, VerificationResult,
};
use ticket_checkout::{
    Config, HttpOrderClient, HttpPaymentVerifier, MockPaymentProvider, TracingNotifier,
    VerificationPolicy, VerificationPoller,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> OrderRequest {
    OrderRequest::new(
        TicketType::new("offline_pass"),
        RegistrationData {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            contact_no: "123".to_string(),
            uni_id: "N/A".to_string(),
            uni_name: "N/A".to_string(),
            where_you_reside: "X".to_string(),
        },
    )
}

// ============================================================================
// POST /order
// ============================================================================

#[tokio::test]
async fn order_payload_matches_the_backend_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .and(body_json(json!({
            "ticket_type": "offline_pass",
            "ticket_data": {
                "name": "A",
                "email": "a@b.com",
                "contact_no": "123",
                "uni_id": "N/A",
                "uni_name": "N/A",
                "where_you_reside": "X"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_1",
            "amount": 50000,
            "currency": "INR",
            "receipt": "rcpt_1",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpOrderClient::new(Client::new(), format!("{}/", server.uri()));
    let order = client.create_order(request()).await.unwrap();

    assert_eq!(order.id, OrderId::new("order_1"));
    assert_eq!(order.amount, 50_000);
    assert_eq!(order.currency, "INR");
}

#[tokio::test]
async fn rejected_order_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let client = HttpOrderClient::new(Client::new(), server.uri());

    assert_eq!(
        client.create(&request()).await,
        Err(ServiceError::Server {
            status: 500,
            message: "database unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn malformed_order_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = HttpOrderClient::new(Client::new(), server.uri());

    assert!(matches!(
        client.create(&request()).await,
        Err(ServiceError::Decode(_))
    ));
}

#[tokio::test]
async fn fractional_amount_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_1",
            "amount": 500.5,
            "currency": "INR"
        })))
        .mount(&server)
        .await;

    let client = HttpOrderClient::new(Client::new(), server.uri());

    assert!(matches!(
        client.create(&request()).await,
        Err(ServiceError::Decode(_))
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = HttpOrderClient::new(
        Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap(),
        uri,
    );

    assert!(matches!(
        client.create(&request()).await,
        Err(ServiceError::Network(_))
    ));
}

// ============================================================================
// GET /check-pay/{order_id}
// ============================================================================

async fn verification_server(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-pay/order_1"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn confirmation_message_confirms() {
    let server = verification_server(200, json!({ "message": "Email sent successfully" })).await;
    let verifier = HttpPaymentVerifier::new(Client::new(), server.uri());

    assert_eq!(
        verifier.check_payment(&OrderId::new("order_1")).await,
        Ok(VerificationResult::CONFIRMED)
    );
}

#[tokio::test]
async fn any_other_message_does_not_confirm() {
    for body in [
        json!({ "message": "pending" }),
        json!({ "message": "email sent successfully" }),
        json!({ "message": null }),
        json!({}),
    ] {
        let server = verification_server(200, body.clone()).await;
        let verifier = HttpPaymentVerifier::new(Client::new(), server.uri());

        assert_eq!(
            verifier.check_payment(&OrderId::new("order_1")).await,
            Ok(VerificationResult::NOT_CONFIRMED),
            "body {body} must not confirm"
        );
    }
}

#[tokio::test]
async fn verification_server_error_is_not_confirmed() {
    let server = verification_server(502, json!({ "message": "Email sent successfully" })).await;
    let verifier = HttpPaymentVerifier::new(Client::new(), server.uri());

    assert!(matches!(
        verifier.check_payment(&OrderId::new("order_1")).await,
        Err(ServiceError::Server { status: 502, .. })
    ));

    let poller = VerificationPoller::new(Arc::new(verifier));
    assert_eq!(
        poller.verify(&OrderId::new("order_1")).await,
        VerificationResult::NOT_CONFIRMED
    );
}

#[tokio::test]
async fn repeated_verification_gives_the_same_answer() {
    let server = verification_server(200, json!({ "message": "Email sent successfully" })).await;
    let poller = VerificationPoller::new(Arc::new(HttpPaymentVerifier::new(
        Client::new(),
        server.uri(),
    )));
    let order_id = OrderId::new("order_1");

    let first = poller.verify(&order_id).await;
    let second = poller.verify(&order_id).await;

    assert_eq!(first, VerificationResult::CONFIRMED);
    assert_eq!(first, second);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn retry_policy_polls_until_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-pay/order_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "pending" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/check-pay/order_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Email sent successfully" })),
        )
        .mount(&server)
        .await;

    let poller = VerificationPoller::with_policy(
        Arc::new(HttpPaymentVerifier::new(Client::new(), server.uri())),
        VerificationPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_millis(10),
        },
    );

    assert_eq!(
        poller.verify(&OrderId::new("order_1")).await,
        VerificationResult::CONFIRMED
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

// ============================================================================
// Configured clients
// ============================================================================

fn short_timeout_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.url = server.uri();
    config.api.timeout_secs = 1;
    config
}

#[tokio::test]
async fn slow_confirmation_outlasts_the_order_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-pay/order_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Email sent successfully" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let env = short_timeout_config(&server)
        .environment(
            Arc::new(MockPaymentProvider::succeeding()),
            Arc::new(TracingNotifier),
        )
        .unwrap();

    assert_eq!(
        env.verifier.verify(&OrderId::new("order_1")).await,
        VerificationResult::CONFIRMED
    );
}

#[tokio::test]
async fn slow_order_creation_still_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "order_1", "amount": 50000, "currency": "INR" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let env = short_timeout_config(&server)
        .environment(
            Arc::new(MockPaymentProvider::succeeding()),
            Arc::new(TracingNotifier),
        )
        .unwrap();

    assert!(matches!(
        env.orders.create_order(request()).await,
        Err(ServiceError::Network(_))
    ));
}

#[tokio::test]
async fn configured_verification_timeout_applies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/check-pay/order_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Email sent successfully" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = short_timeout_config(&server);
    config.verification.timeout_secs = Some(1);
    let verifier = HttpPaymentVerifier::new(config.verification.http_client().unwrap(), server.uri());

    assert!(matches!(
        verifier.check_payment(&OrderId::new("order_1")).await,
        Err(ServiceError::Network(_))
    ));
}
