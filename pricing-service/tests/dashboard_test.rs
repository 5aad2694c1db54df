//! Dashboard aggregation integration tests.

mod common;

use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn empty_dashboard_is_zeroed() {
    let app = TestApp::spawn().await;

    let dashboard = app.get_json("/api/dashboard/").await;
    assert_eq!(dashboard["total_customers"], 0);
    assert_eq!(dashboard["active_subscriptions"], 0);
    assert_eq!(dashboard["total_revenue"], "0.00");
    assert_eq!(dashboard["monthly_revenue"], "0.00");
    assert_eq!(dashboard["popular_plan"], Value::Null);
    assert_eq!(dashboard["revenue_by_plan"], serde_json::json!({}));
    assert_eq!(dashboard["monthly_revenue_trend"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn revenue_counts_paid_invoices_only() {
    let app = TestApp::spawn().await;
    let basic = app.create_plan("Basic", "10.00").await;
    let pro = app.create_plan("Pro", "50.00").await;
    let acme = app.create_customer("Acme", "ops@acme.test").await;
    let globex = app.create_customer("Globex", "ops@globex.test").await;

    let s1 = app.create_subscription(&acme, &pro, "active").await;
    let s2 = app.create_subscription(&globex, &pro, "trial").await;
    let s3 = app.create_subscription(&globex, &basic, "active").await;
    app.create_subscription(&acme, &basic, "cancelled").await;

    app.create_invoice(&s1, "100.00", "paid").await;
    app.create_invoice(&s3, "50.00", "paid").await;
    app.create_invoice(&s2, "30.00", "draft").await;
    app.create_invoice(&s2, "20.00", "overdue").await;

    let dashboard = app.get_json("/api/dashboard/").await;
    assert_eq!(dashboard["total_customers"], 2);
    assert_eq!(dashboard["active_subscriptions"], 2);
    assert_eq!(dashboard["trial_subscriptions"], 1);
    assert_eq!(dashboard["total_revenue"], "150.00");
    assert_eq!(dashboard["monthly_revenue"], "150.00");
    assert_eq!(dashboard["pending_invoices"], 1);
    assert_eq!(dashboard["overdue_invoices"], 1);
    assert_eq!(dashboard["popular_plan"], "Pro");
    assert_eq!(dashboard["revenue_by_plan"]["Pro"], "100.00");
    assert_eq!(dashboard["revenue_by_plan"]["Basic"], "50.00");

    let trend = dashboard["monthly_revenue_trend"].as_array().unwrap();
    let current = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(trend[11]["month"], current.as_str());
    assert_eq!(trend[11]["revenue"], "150.00");
}
