use crate::dtos::SubscriptionResponse;
use crate::models::money::validate_money;
use crate::models::{BillingCycle, NewPlan, PlanType, PricingPlan};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_max_loan_applications() -> i32 {
    100
}

fn default_max_users() -> i32 {
    5
}

fn default_max_storage_gb() -> i32 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[validate(custom(function = "validate_money"))]
    pub base_price: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_money"))]
    pub setup_fee: Decimal,
    #[serde(default = "default_max_loan_applications")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_loan_applications: i32,
    #[serde(default = "default_max_users")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_users: i32,
    #[serde(default = "default_max_storage_gb")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_storage_gb: i32,
    #[serde(default)]
    pub api_access: bool,
    #[serde(default)]
    pub advanced_analytics: bool,
    #[serde(default)]
    pub priority_support: bool,
    #[serde(default)]
    pub white_label: bool,
    #[serde(default)]
    pub custom_integrations: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl From<CreatePlanRequest> for NewPlan {
    fn from(req: CreatePlanRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            plan_type: req.plan_type,
            billing_cycle: req.billing_cycle,
            base_price: req.base_price,
            setup_fee: req.setup_fee,
            max_loan_applications: req.max_loan_applications,
            max_users: req.max_users,
            max_storage_gb: req.max_storage_gb,
            api_access: req.api_access,
            advanced_analytics: req.advanced_analytics,
            priority_support: req.priority_support,
            white_label: req.white_label,
            custom_integrations: req.custom_integrations,
            is_active: req.is_active,
            is_featured: req.is_featured,
        }
    }
}

/// Partial plan update, used by both PUT and PATCH.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub plan_type: Option<PlanType>,
    pub billing_cycle: Option<BillingCycle>,
    #[validate(custom(function = "validate_money"))]
    pub base_price: Option<Decimal>,
    #[validate(custom(function = "validate_money"))]
    pub setup_fee: Option<Decimal>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_loan_applications: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_users: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub max_storage_gb: Option<i32>,
    pub api_access: Option<bool>,
    pub advanced_analytics: Option<bool>,
    pub priority_support: Option<bool>,
    pub white_label: Option<bool>,
    pub custom_integrations: Option<bool>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl UpdatePlanRequest {
    /// Overwrite the fields present in the request.
    pub fn apply(self, plan: &mut PricingPlan) {
        if let Some(v) = self.name {
            plan.name = v;
        }
        if let Some(v) = self.description {
            plan.description = v;
        }
        if let Some(v) = self.plan_type {
            plan.plan_type = v;
        }
        if let Some(v) = self.billing_cycle {
            plan.billing_cycle = v;
        }
        if let Some(v) = self.base_price {
            plan.base_price = crate::models::money::to_money(v);
        }
        if let Some(v) = self.setup_fee {
            plan.setup_fee = crate::models::money::to_money(v);
        }
        if let Some(v) = self.max_loan_applications {
            plan.max_loan_applications = v;
        }
        if let Some(v) = self.max_users {
            plan.max_users = v;
        }
        if let Some(v) = self.max_storage_gb {
            plan.max_storage_gb = v;
        }
        if let Some(v) = self.api_access {
            plan.api_access = v;
        }
        if let Some(v) = self.advanced_analytics {
            plan.advanced_analytics = v;
        }
        if let Some(v) = self.priority_support {
            plan.priority_support = v;
        }
        if let Some(v) = self.white_label {
            plan.white_label = v;
        }
        if let Some(v) = self.custom_integrations {
            plan.custom_integrations = v;
        }
        if let Some(v) = self.is_active {
            plan.is_active = v;
        }
        if let Some(v) = self.is_featured {
            plan.is_featured = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub plan_type: PlanType,
    pub billing_cycle: BillingCycle,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub monthly_price: Decimal,
}

impl From<PricingPlan> for PlanResponse {
    fn from(plan: PricingPlan) -> Self {
        let monthly_price = plan.monthly_price();
        Self {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            plan_type: plan.plan_type,
            billing_cycle: plan.billing_cycle,
            base_price: plan.base_price,
            setup_fee: plan.setup_fee,
            max_loan_applications: plan.max_loan_applications,
            max_users: plan.max_users,
            max_storage_gb: plan.max_storage_gb,
            api_access: plan.api_access,
            advanced_analytics: plan.advanced_analytics,
            priority_support: plan.priority_support,
            white_label: plan.white_label,
            custom_integrations: plan.custom_integrations,
            is_active: plan.is_active,
            is_featured: plan.is_featured,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
            monthly_price,
        }
    }
}

/// Plan with its subscriptions, returned by `GET /api/plans/{id}/`.
#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    #[serde(flatten)]
    pub plan: PlanResponse,
    pub subscriptions: Vec<SubscriptionResponse>,
    pub subscription_count: usize,
}
