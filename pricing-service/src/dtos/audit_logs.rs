use crate::models::{AuditAction, AuditLogView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogListParams {
    pub action_type: Option<AuditAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogResponse {
    pub id: Uuid,
    pub action_type: AuditAction,
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

impl From<AuditLogView> for AuditLogResponse {
    fn from(view: AuditLogView) -> Self {
        let log = view.log;
        Self {
            id: log.id,
            action_type: log.action_type,
            description: log.description,
            plan: log.plan_id,
            plan_name: view.plan_name,
            customer: log.customer_id,
            customer_name: view.customer_name,
            subscription: log.subscription_id,
            invoice: log.invoice_id,
            changes: log.changes,
            timestamp: log.timestamp,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
        }
    }
}
