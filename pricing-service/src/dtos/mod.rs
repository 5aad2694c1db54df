//! Request and response shapes for the REST API.

mod audit_logs;
mod customers;
mod invoices;
mod plans;
mod settings;
mod subscriptions;

pub use audit_logs::{AuditLogListParams, AuditLogResponse};
pub use customers::{CreateCustomerRequest, CustomerDetailResponse, CustomerResponse, UpdateCustomerRequest};
pub use invoices::{CreateInvoiceRequest, InvoiceResponse, UpdateInvoiceRequest};
pub use plans::{CreatePlanRequest, PlanDetailResponse, PlanResponse, UpdatePlanRequest};
pub use settings::{SettingsRequest, SettingsResponse};
pub use subscriptions::{
    CreateSubscriptionRequest, SubscriptionDetailResponse, SubscriptionResponse,
    UpdateSubscriptionRequest,
};

use serde::{Deserialize, Deserializer};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        end_date: Option<Option<String>>,
    }

    #[test]
    fn double_option_separates_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.end_date, None);

        let null: Patch = serde_json::from_str(r#"{"end_date": null}"#).unwrap();
        assert_eq!(null.end_date, Some(None));

        let set: Patch = serde_json::from_str(r#"{"end_date": "x"}"#).unwrap();
        assert_eq!(set.end_date, Some(Some("x".to_string())));
    }
}
