//! Response payloads returned by pricing-service.
//!
//! Enumerated fields (statuses, plan types, currencies) are kept as strings
//! so the client keeps decoding when the service grows new variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub plan_type: String,
    pub billing_cycle: String,
    pub base_price: Decimal,
    pub setup_fee: Decimal,
    pub max_loan_applications: i32,
    pub max_users: i32,
    pub max_storage_gb: i32,
    pub api_access: bool,
    pub advanced_analytics: bool,
    pub priority_support: bool,
    pub white_label: bool,
    pub custom_integrations: bool,
    pub is_active: bool,
    pub is_featured: bool,
    pub monthly_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub subscriptions: Vec<Subscription>,
    pub subscription_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub customer_type: String,
    pub status: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub billing_email: Option<String>,
    pub tax_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub subscriptions: Vec<Subscription>,
    pub active_subscriptions: usize,
    pub total_spent: Decimal,
}

/// Subscription as listed; `customer` and `plan` are ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub customer: Uuid,
    pub customer_name: String,
    pub plan: Uuid,
    pub plan_name: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub custom_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub current_loan_applications: i32,
    pub current_users: i32,
    pub current_storage_gb: i32,
    pub effective_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single subscription with its customer, plan and invoices embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDetail {
    pub id: Uuid,
    pub customer: Customer,
    pub plan: Plan,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub custom_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub current_loan_applications: i32,
    pub current_users: i32,
    pub current_storage_gb: i32,
    pub effective_price: Decimal,
    pub usage_percentage: f64,
    pub invoices: Vec<Invoice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub subscription: Uuid,
    pub customer_name: String,
    pub plan_name: String,
    pub invoice_number: String,
    pub status: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    pub default_currency: String,
    pub tax_rate: Decimal,
    pub trial_days: i32,
    pub trial_plan: Option<Uuid>,
    pub trial_plan_name: Option<String>,
    pub invoice_prefix: String,
    pub invoice_notes: String,
    pub payment_terms_days: i32,
    pub allow_custom_pricing: bool,
    pub require_approval_for_custom: bool,
    pub auto_renewal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action_type: String,
    pub description: String,
    pub plan: Option<Uuid>,
    pub plan_name: Option<String>,
    pub customer: Option<Uuid>,
    pub customer_name: Option<String>,
    pub subscription: Option<Uuid>,
    pub invoice: Option<Uuid>,
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_customers: i64,
    pub active_subscriptions: i64,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub pending_invoices: i64,
    pub overdue_invoices: i64,
    pub trial_subscriptions: i64,
    pub popular_plan: Option<String>,
    pub revenue_by_plan: BTreeMap<String, Decimal>,
    pub monthly_revenue_trend: Vec<MonthlyRevenue>,
}
