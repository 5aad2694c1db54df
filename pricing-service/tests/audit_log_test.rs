//! Audit trail integration tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};

fn actions(logs: &Value) -> Vec<String> {
    logs.as_array()
        .unwrap()
        .iter()
        .map(|l| l["action_type"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn writes_are_audited_newest_first() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;
    let customer = app.create_customer("Acme", "ops@acme.test").await;
    let subscription = app.create_subscription(&customer, &plan, "active").await;
    let invoice = app.create_invoice(&subscription, "50.00", "sent").await;

    app.patch(
        &format!("/api/invoices/{}/", invoice["id"].as_str().unwrap()),
        &json!({ "status": "paid" }),
    )
    .await;
    app.put(
        &format!("/api/subscriptions/{}/", subscription["id"].as_str().unwrap()),
        &json!({ "status": "cancelled" }),
    )
    .await;

    let logs = app.get_json("/api/audit-logs/").await;
    assert_eq!(
        actions(&logs),
        vec![
            "subscription_cancelled",
            "invoice_paid",
            "invoice_created",
            "subscription_created",
            "customer_created",
            "plan_created",
        ]
    );
}

#[tokio::test]
async fn entries_capture_caller_and_changes() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Pro", "50.00").await;

    let response = app
        .client
        .patch(app.url(&format!("/api/plans/{}/", plan["id"].as_str().unwrap())))
        .header("user-agent", "pricing-admin/1.0")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.2")
        .json(&json!({ "base_price": "55.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let logs = app.get_json("/api/audit-logs/?action_type=plan_updated").await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);

    let entry = &logs[0];
    assert_eq!(entry["plan"], plan["id"]);
    assert_eq!(entry["plan_name"], "Pro");
    assert_eq!(entry["ip_address"], "203.0.113.9");
    assert_eq!(entry["user_agent"], "pricing-admin/1.0");
    assert_eq!(entry["changes"]["before"]["base_price"], "50.00");
    assert_eq!(entry["changes"]["after"]["base_price"], "55.00");

    let single = app
        .get_json(&format!("/api/audit-logs/{}/", entry["id"].as_str().unwrap()))
        .await;
    assert_eq!(single["id"], entry["id"]);
}

#[tokio::test]
async fn deleted_plan_keeps_snapshot() {
    let app = TestApp::spawn().await;
    let plan = app.create_plan("Gone", "5.00").await;
    app.delete(&format!("/api/plans/{}/", plan["id"].as_str().unwrap()))
        .await;

    let logs = app.get_json("/api/audit-logs/").await;
    assert_eq!(actions(&logs), vec!["plan_deleted", "plan_created"]);
    assert_eq!(logs[0]["plan"], Value::Null);
    assert_eq!(logs[0]["changes"]["name"], "Gone");
    // The creation entry lost its reference along with the row.
    assert_eq!(logs[1]["plan"], Value::Null);
}

#[tokio::test]
async fn settings_writes_are_audited() {
    let app = TestApp::spawn().await;
    app.put("/api/settings/", &json!({ "trial_days": 30 })).await;

    let logs = app
        .get_json("/api/audit-logs/?action_type=settings_updated")
        .await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["changes"]["before"]["trial_days"], 14);
    assert_eq!(logs[0]["changes"]["after"]["trial_days"], 30);
}

#[tokio::test]
async fn unknown_audit_log_is_404() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/audit-logs/00000000-0000-4000-8000-000000000000/")
        .await;
    assert_eq!(response.status().as_u16(), 404);
}
