//! Invoice integration tests.

mod common;

use common::{error_fields, TestApp};
use serde_json::{json, Value};

async fn subscription(app: &TestApp) -> Value {
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    app.create_subscription(&customer, &plan, "active").await
}

#[tokio::test]
async fn create_invoice_fills_number_dates_and_total() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;

    let invoice = app
        .create(
            "/api/invoices/",
            json!({
                "subscription": subscription["id"],
                "subtotal": "100.00",
                "tax_amount": "8.25",
                "discount_amount": "10.00"
            }),
        )
        .await;

    let number = invoice["invoice_number"].as_str().unwrap();
    assert!(number.starts_with("INV-"), "unexpected number {}", number);
    assert_eq!(number.len(), "INV-YYYYMMDD-".len() + 8);
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["total_amount"], "98.25");
    assert_eq!(invoice["subscription_id"], subscription["id"]);
    assert_eq!(invoice["customer_name"], "Acme");
    assert_eq!(invoice["plan_name"], "Pro");

    let issue = chrono::DateTime::parse_from_rfc3339(invoice["issue_date"].as_str().unwrap()).unwrap();
    let due = chrono::DateTime::parse_from_rfc3339(invoice["due_date"].as_str().unwrap()).unwrap();
    assert_eq!((due - issue).num_days(), 30);
}

#[tokio::test]
async fn duplicate_invoice_number_is_a_field_error() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;
    let body = json!({
        "subscription": subscription["id"],
        "invoice_number": "INV-FIXED-1",
        "subtotal": "10.00"
    });

    app.create("/api/invoices/", body.clone()).await;
    let response = app.post("/api/invoices/", &body).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_fields(&body), vec!["invoice_number"]);
}

#[tokio::test]
async fn unknown_subscription_is_a_field_error() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/api/invoices/",
            &json!({
                "subscription": "00000000-0000-4000-8000-000000000000",
                "subtotal": "10.00"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_fields(&body), vec!["subscription"]);
}

#[tokio::test]
async fn pending_lists_draft_and_sent_only() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;
    for status in ["draft", "sent", "paid", "overdue", "cancelled"] {
        app.create_invoice(&subscription, "10.00", status).await;
    }

    let pending = app.get_json("/api/invoices/pending/").await;
    let mut statuses: Vec<&str> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["status"].as_str().unwrap())
        .collect();
    statuses.sort();
    assert_eq!(statuses, vec!["draft", "sent"]);

    let all = app.get_json("/api/invoices/").await;
    assert_eq!(all.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn marking_paid_stamps_paid_date() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;
    let invoice = app.create_invoice(&subscription, "10.00", "sent").await;
    assert_eq!(invoice["paid_date"], Value::Null);

    let path = format!("/api/invoices/{}/", invoice["id"].as_str().unwrap());
    let response = app.put(&path, &json!({ "status": "paid" })).await;
    assert_eq!(response.status().as_u16(), 200);
    let paid: Value = response.json().await.unwrap();
    assert_eq!(paid["status"], "paid");
    assert_ne!(paid["paid_date"], Value::Null);
}

#[tokio::test]
async fn update_rejects_negative_amounts() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;
    let invoice = app.create_invoice(&subscription, "10.00", "draft").await;

    let path = format!("/api/invoices/{}/", invoice["id"].as_str().unwrap());
    let response = app.patch(&path, &json!({ "subtotal": "-5.00" })).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_fields(&body), vec!["subtotal"]);

    let unchanged = app.get_json(&path).await;
    assert_eq!(unchanged["subtotal"], "10.00");
}

#[tokio::test]
async fn deleting_subscription_removes_invoices() {
    let app = TestApp::spawn().await;
    let subscription = subscription(&app).await;
    let invoice = app.create_invoice(&subscription, "10.00", "draft").await;

    let response = app
        .delete(&format!("/api/subscriptions/{}/", subscription["id"].as_str().unwrap()))
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let path = format!("/api/invoices/{}/", invoice["id"].as_str().unwrap());
    assert_eq!(app.get(&path).await.status().as_u16(), 404);
}
