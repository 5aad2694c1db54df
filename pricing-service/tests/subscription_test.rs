//! Subscription integration tests.

mod common;

use common::{error_fields, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn trial_subscription_gets_trial_end_from_settings() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;

    let subscription = app
        .create(
            "/api/subscriptions/",
            json!({
                "customer": customer["id"],
                "plan": plan["id"],
                "start_date": "2024-01-01T00:00:00Z"
            }),
        )
        .await;

    assert_eq!(subscription["status"], "trial");
    assert_eq!(subscription["trial_end_date"], "2024-01-15T00:00:00Z");
    assert_eq!(subscription["customer_name"], "Acme");
    assert_eq!(subscription["plan_name"], "Pro");
    assert_eq!(subscription["discount_percentage"], "0.00");
    assert_eq!(subscription["effective_price"], "50.00");
}

#[tokio::test]
async fn effective_price_applies_discount() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;

    let subscription = app
        .create(
            "/api/subscriptions/",
            json!({
                "customer": customer["id"],
                "plan": plan["id"],
                "status": "active",
                "start_date": "2024-01-01T00:00:00Z",
                "discount_percentage": "20.00"
            }),
        )
        .await;
    assert_eq!(subscription["effective_price"], "40.00");
    assert_eq!(subscription["trial_end_date"], Value::Null);
}

#[tokio::test]
async fn zero_custom_price_uses_plan_price() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;

    let subscription = app
        .create(
            "/api/subscriptions/",
            json!({
                "customer": customer["id"],
                "plan": plan["id"],
                "status": "active",
                "start_date": "2024-01-01T00:00:00Z",
                "custom_price": "0.00",
                "discount_percentage": "20.00"
            }),
        )
        .await;
    assert_eq!(subscription["custom_price"], "0.00");
    assert_eq!(subscription["effective_price"], "40.00");
}

#[tokio::test]
async fn discount_out_of_range_is_rejected() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;

    for discount in ["-1.00", "100.01"] {
        let response = app
            .post(
                "/api/subscriptions/",
                &json!({
                    "customer": customer["id"],
                    "plan": plan["id"],
                    "start_date": "2024-01-01T00:00:00Z",
                    "discount_percentage": discount
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 400, "discount {}", discount);
        let body: Value = response.json().await.unwrap();
        assert_eq!(error_fields(&body), vec!["discount_percentage"]);
    }
}

#[tokio::test]
async fn unknown_references_are_field_errors() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;

    let response = app
        .post(
            "/api/subscriptions/",
            &json!({
                "customer": "00000000-0000-4000-8000-000000000000",
                "plan": plan["id"],
                "start_date": "2024-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_fields(&body), vec!["customer"]);
}

#[tokio::test]
async fn custom_price_respects_settings() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let body = json!({
        "customer": customer["id"],
        "plan": plan["id"],
        "status": "active",
        "start_date": "2024-01-01T00:00:00Z",
        "custom_price": "80.00",
        "discount_percentage": "10.00"
    });

    let subscription = app.create("/api/subscriptions/", body.clone()).await;
    assert_eq!(subscription["effective_price"], "72.00");

    app.put("/api/settings/", &json!({ "allow_custom_pricing": false }))
        .await;

    let response = app.post("/api/subscriptions/", &body).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_fields(&body), vec!["custom_price"]);
}

#[tokio::test]
async fn subscription_detail_nests_related_records() {
    let app = TestApp::spawn().await;
    let plan = app
        .create(
            "/api/plans/",
            json!({
                "name": "Metered",
                "plan_type": "standard",
                "base_price": "10.00",
                "max_loan_applications": 200
            }),
        )
        .await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let subscription = app
        .create(
            "/api/subscriptions/",
            json!({
                "customer": customer["id"],
                "plan": plan["id"],
                "status": "active",
                "start_date": "2024-01-01T00:00:00Z",
                "current_loan_applications": 50
            }),
        )
        .await;
    app.create_invoice(&subscription, "10.00", "draft").await;

    let detail = app
        .get_json(&format!("/api/subscriptions/{}/", subscription["id"].as_str().unwrap()))
        .await;
    assert_eq!(detail["customer"]["email"], "ops@acme.test");
    assert_eq!(detail["plan"]["name"], "Metered");
    assert_eq!(detail["usage_percentage"], 25.0);
    assert_eq!(detail["invoices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_can_clear_nullable_fields() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let subscription = app.create_subscription(&customer, &plan, "trial").await;
    let path = format!("/api/subscriptions/{}/", subscription["id"].as_str().unwrap());
    assert_ne!(subscription["trial_end_date"], Value::Null);

    let response = app
        .patch(&path, &json!({ "trial_end_date": null, "status": "active" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["trial_end_date"], Value::Null);
    assert_eq!(updated["status"], "active");
}

#[tokio::test]
async fn active_listing_and_newest_first_ordering() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let first = app.create_subscription(&customer, &plan, "active").await;
    let second = app.create_subscription(&customer, &plan, "trial").await;

    let all = app.get_json("/api/subscriptions/").await;
    assert_eq!(all[0]["id"], second["id"]);
    assert_eq!(all[1]["id"], first["id"]);

    let active = app.get_json("/api/subscriptions/active/").await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], first["id"]);
}

#[tokio::test]
async fn deleting_plan_removes_its_subscriptions() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let subscription = app.create_subscription(&customer, &plan, "active").await;

    app.delete(&format!("/api/plans/{}/", plan["id"].as_str().unwrap()))
        .await;

    let path = format!("/api/subscriptions/{}/", subscription["id"].as_str().unwrap());
    assert_eq!(app.get(&path).await.status().as_u16(), 404);
}
