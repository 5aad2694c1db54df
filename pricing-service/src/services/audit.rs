//! Audit trail recording.

use crate::middleware::RequestMeta;
use crate::models::NewAuditLog;
use crate::services::store::PricingStore;
use serde::Serialize;
use serde_json::{json, Value};

/// Snapshot of an entity as it appears in the API.
pub fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// `changes` payload for an update.
pub fn diff<T: Serialize>(before: &T, after: &T) -> Value {
    json!({ "before": snapshot(before), "after": snapshot(after) })
}

/// Append an audit entry stamped with the caller's details.
///
/// The primary write has already succeeded, so a failure here is only logged.
pub async fn record(store: &dyn PricingStore, meta: &RequestMeta, entry: NewAuditLog) {
    let entry = NewAuditLog {
        ip_address: meta.ip_address.clone(),
        user_agent: meta.user_agent.clone(),
        ..entry
    };

    if let Err(e) = store.record_audit(&entry).await {
        tracing::warn!(
            error = %e,
            action_type = %entry.action_type,
            "Failed to record audit log"
        );
    }
}
