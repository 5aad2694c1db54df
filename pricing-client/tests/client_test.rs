use pricing_client::{ClientError, PricingClient, PricingClientConfig};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, token: Option<&str>) -> PricingClient {
    PricingClient::new(PricingClientConfig {
        base_url: server.uri(),
        token: token.map(str::to_string),
        ..Default::default()
    })
    .expect("client should build")
}

fn plan_json(id: Uuid) -> Value {
    json!({
        "id": id,
        "name": "Starter",
        "description": "",
        "plan_type": "basic",
        "billing_cycle": "quarterly",
        "base_price": "30.00",
        "setup_fee": "0.00",
        "max_loan_applications": 100,
        "max_users": 5,
        "max_storage_gb": 10,
        "api_access": false,
        "advanced_analytics": false,
        "priority_support": false,
        "white_label": false,
        "custom_integrations": false,
        "is_active": true,
        "is_featured": false,
        "monthly_price": "10.00",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

fn invoice_json(id: Uuid, status: &str) -> Value {
    json!({
        "id": id,
        "subscription": Uuid::new_v4(),
        "subscription_id": Uuid::new_v4(),
        "customer_name": "Acme",
        "plan_name": "Starter",
        "invoice_number": "INV-202401-ABCDEF12",
        "status": status,
        "issue_date": "2024-01-01T00:00:00Z",
        "due_date": "2024-01-31T00:00:00Z",
        "paid_date": if status == "paid" { json!("2024-01-15T00:00:00Z") } else { Value::Null },
        "subtotal": "100.00",
        "tax_amount": "8.00",
        "discount_amount": "0.00",
        "total_amount": "108.00",
        "notes": "",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn active_plans_are_fetched_with_bearer_token() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/plans/active/"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([plan_json(id)])))
        .expect(1)
        .mount(&server)
        .await;

    let plans = client_for(&server, Some("secret-token"))
        .get_active_plans()
        .await
        .unwrap();

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, id);
    assert_eq!(plans[0].monthly_price.to_string(), "10.00");
}

#[tokio::test]
async fn cancel_subscription_sends_cancelled_status() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PUT"))
        .and(path(format!("/api/subscriptions/{}/", id)))
        .and(body_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "customer": Uuid::new_v4(),
            "customer_name": "Acme",
            "plan": Uuid::new_v4(),
            "plan_name": "Starter",
            "status": "cancelled",
            "start_date": "2024-01-01T00:00:00Z",
            "end_date": null,
            "trial_end_date": null,
            "custom_price": null,
            "discount_percentage": "0.00",
            "current_loan_applications": 0,
            "current_users": 0,
            "current_storage_gb": 0,
            "effective_price": "10.00",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let subscription = client_for(&server, None)
        .cancel_subscription(id)
        .await
        .unwrap();

    assert_eq!(subscription.status, "cancelled");
    assert!(subscription.custom_price.is_none());
}

#[tokio::test]
async fn mark_invoice_paid_sends_paid_status() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PUT"))
        .and(path(format!("/api/invoices/{}/", id)))
        .and(body_json(json!({ "status": "paid" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(id, "paid")))
        .expect(1)
        .mount(&server)
        .await;

    let invoice = client_for(&server, None).mark_invoice_paid(id).await.unwrap();

    assert_eq!(invoice.status, "paid");
    assert!(invoice.paid_date.is_some());
}

#[tokio::test]
async fn validation_failure_surfaces_status_and_body() {
    let server = MockServer::start().await;
    let error_body = json!({
        "error": "Validation failed",
        "fields": { "name": [{ "code": "unique" }] }
    });

    Mock::given(method("POST"))
        .and(path("/api/plans/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .create_plan(&json!({ "name": "Starter", "plan_type": "basic", "base_price": "10.00" }))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    match err {
        ClientError::Status { body, .. } => assert!(body.contains("unique")),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/dashboard/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, None).get_dashboard().await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    match err {
        ClientError::Status { body, .. } => assert!(body.is_empty()),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/settings/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server, None).get_settings().await.unwrap_err();

    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let client = PricingClient::new(PricingClientConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..Default::default()
    })
    .unwrap();

    let err = client.get_plans().await.unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn delete_plan_accepts_no_content() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/plans/{}/", id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None).delete_plan(id).await.unwrap();
}
