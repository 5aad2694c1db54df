use crate::dtos::{double_option, CustomerResponse, InvoiceResponse, PlanResponse};
use crate::models::money::{to_money, validate_money, validate_percentage};
use crate::models::{NewSubscription, Subscription, SubscriptionStatus, SubscriptionView};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    pub customer: Uuid,
    pub plan: Uuid,
    #[serde(default)]
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "validate_money"))]
    pub custom_price: Option<Decimal>,
    #[serde(default)]
    #[validate(custom(function = "validate_percentage"))]
    pub discount_percentage: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_loan_applications: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_users: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_storage_gb: i32,
}

impl From<CreateSubscriptionRequest> for NewSubscription {
    fn from(req: CreateSubscriptionRequest) -> Self {
        Self {
            customer_id: req.customer,
            plan_id: req.plan,
            status: req.status,
            start_date: req.start_date,
            end_date: req.end_date,
            trial_end_date: req.trial_end_date,
            custom_price: req.custom_price,
            discount_percentage: req.discount_percentage,
            current_loan_applications: req.current_loan_applications,
            current_users: req.current_users,
            current_storage_gb: req.current_storage_gb,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    pub customer: Option<Uuid>,
    pub plan: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub trial_end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub custom_price: Option<Option<Decimal>>,
    #[validate(custom(function = "validate_percentage"))]
    pub discount_percentage: Option<Decimal>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_loan_applications: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_users: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_storage_gb: Option<i32>,
}

impl UpdateSubscriptionRequest {
    /// Derived rules plus the nullable custom price.
    pub fn validate_request(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();
        if let Some(Some(price)) = &self.custom_price {
            if let Err(e) = validate_money(price) {
                errors.add("custom_price", e);
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn apply(self, subscription: &mut Subscription) {
        if let Some(v) = self.customer {
            subscription.customer_id = v;
        }
        if let Some(v) = self.plan {
            subscription.plan_id = v;
        }
        if let Some(v) = self.status {
            subscription.status = v;
        }
        if let Some(v) = self.start_date {
            subscription.start_date = v;
        }
        if let Some(v) = self.end_date {
            subscription.end_date = v;
        }
        if let Some(v) = self.trial_end_date {
            subscription.trial_end_date = v;
        }
        if let Some(v) = self.custom_price {
            subscription.custom_price = v.map(to_money);
        }
        if let Some(v) = self.discount_percentage {
            subscription.discount_percentage = to_money(v);
        }
        if let Some(v) = self.current_loan_applications {
            subscription.current_loan_applications = v;
        }
        if let Some(v) = self.current_users {
            subscription.current_users = v;
        }
        if let Some(v) = self.current_storage_gb {
            subscription.current_storage_gb = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub customer: Uuid,
    pub customer_name: String,
    pub plan: Uuid,
    pub plan_name: String,
    pub status: SubscriptionStatus,
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

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        let effective_price = view.effective_price();
        let s = view.subscription;
        Self {
            id: s.id,
            customer: s.customer_id,
            customer_name: view.customer_name,
            plan: s.plan_id,
            plan_name: view.plan_name,
            status: s.status,
            start_date: s.start_date,
            end_date: s.end_date,
            trial_end_date: s.trial_end_date,
            custom_price: s.custom_price,
            discount_percentage: s.discount_percentage,
            current_loan_applications: s.current_loan_applications,
            current_users: s.current_users,
            current_storage_gb: s.current_storage_gb,
            effective_price,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Subscription with its customer, plan and invoices, returned by
/// `GET /api/subscriptions/{id}/`.
#[derive(Debug, Serialize)]
pub struct SubscriptionDetailResponse {
    pub id: Uuid,
    pub customer: CustomerResponse,
    pub plan: PlanResponse,
    pub status: SubscriptionStatus,
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
    pub invoices: Vec<InvoiceResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_outside_percentage_range_is_rejected() {
        let req: CreateSubscriptionRequest = serde_json::from_value(serde_json::json!({
            "customer": Uuid::new_v4(),
            "plan": Uuid::new_v4(),
            "start_date": "2024-01-01T00:00:00Z",
            "discount_percentage": "150.00"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("discount_percentage"));
    }

    #[test]
    fn status_defaults_to_trial() {
        let req: CreateSubscriptionRequest = serde_json::from_value(serde_json::json!({
            "customer": Uuid::new_v4(),
            "plan": Uuid::new_v4(),
            "start_date": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(req.status, SubscriptionStatus::Trial);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn negative_custom_price_on_update_is_rejected() {
        let req: UpdateSubscriptionRequest =
            serde_json::from_str(r#"{"custom_price": "-1.00"}"#).unwrap();
        assert!(req.validate_request().is_err());

        let clear: UpdateSubscriptionRequest =
            serde_json::from_str(r#"{"custom_price": null}"#).unwrap();
        assert!(clear.validate_request().is_ok());
        assert_eq!(clear.custom_price, Some(None));
    }
}
