//! Append-only audit trail entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    PlanCreated,
    PlanUpdated,
    PlanDeleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCancelled,
    InvoiceCreated,
    InvoicePaid,
    CustomerCreated,
    CustomerUpdated,
    SettingsUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanCreated => "plan_created",
            Self::PlanUpdated => "plan_updated",
            Self::PlanDeleted => "plan_deleted",
            Self::SubscriptionCreated => "subscription_created",
            Self::SubscriptionUpdated => "subscription_updated",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::InvoiceCreated => "invoice_created",
            Self::InvoicePaid => "invoice_paid",
            Self::CustomerCreated => "customer_created",
            Self::CustomerUpdated => "customer_updated",
            Self::SettingsUpdated => "settings_updated",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub action_type: AuditAction,
    pub description: String,
    pub plan_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

/// Audit entry joined with the names of its plan and customer.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AuditLogView {
    #[sqlx(flatten)]
    pub log: AuditLog,
    pub plan_name: Option<String>,
    pub customer_name: Option<String>,
}

/// Input for appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action_type: AuditAction,
    pub description: String,
    pub plan_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub changes: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl NewAuditLog {
    pub fn new(action_type: AuditAction, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            plan_id: None,
            customer_id: None,
            subscription_id: None,
            invoice_id: None,
            changes: serde_json::Value::Object(Default::default()),
            ip_address: None,
            user_agent: String::new(),
        }
    }

    pub fn into_log(self, id: Uuid, now: DateTime<Utc>) -> AuditLog {
        AuditLog {
            id,
            action_type: self.action_type,
            description: self.description,
            plan_id: self.plan_id,
            customer_id: self.customer_id,
            subscription_id: self.subscription_id,
            invoice_id: self.invoice_id,
            changes: self.changes,
            timestamp: now,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListAuditLogsFilter {
    pub action_type: Option<AuditAction>,
}
