//! Pricing plan model.

use super::money::to_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Product tier of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Standard,
    Premium,
    Enterprise,
    Custom,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
            Self::Custom => "custom",
        }
    }
}

/// How often a plan's base price is charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    Lifetime,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Number of months one charge covers. Lifetime amortizes over ten years.
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
            Self::Lifetime => 120,
        }
    }

    /// Normalize a price charged once per cycle to a per-month price.
    pub fn monthly_price(&self, price: Decimal) -> Decimal {
        to_money(price / Decimal::from(self.months()))
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pricing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PricingPlan {
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
}

impl PricingPlan {
    /// Base price normalized to one month of the billing cycle.
    pub fn monthly_price(&self) -> Decimal {
        self.billing_cycle.monthly_price(self.base_price)
    }
}

/// Input for creating a plan, defaults already applied.
#[derive(Debug, Clone)]
pub struct NewPlan {
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
}

impl NewPlan {
    pub fn into_plan(self, id: Uuid, now: DateTime<Utc>) -> PricingPlan {
        PricingPlan {
            id,
            name: self.name,
            description: self.description,
            plan_type: self.plan_type,
            billing_cycle: self.billing_cycle,
            base_price: to_money(self.base_price),
            setup_fee: to_money(self.setup_fee),
            max_loan_applications: self.max_loan_applications,
            max_users: self.max_users,
            max_storage_gb: self.max_storage_gb,
            api_access: self.api_access,
            advanced_analytics: self.advanced_analytics,
            priority_support: self.priority_support,
            white_label: self.white_label,
            custom_integrations: self.custom_integrations,
            is_active: self.is_active,
            is_featured: self.is_featured,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing plans.
#[derive(Debug, Clone, Default)]
pub struct ListPlansFilter {
    pub active_only: bool,
    pub featured_only: bool,
}

impl ListPlansFilter {
    pub fn matches(&self, plan: &PricingPlan) -> bool {
        (!self.active_only || plan.is_active) && (!self.featured_only || plan.is_featured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn monthly_price_divides_by_cycle_length() {
        let cases = [
            (BillingCycle::Monthly, "49.99", "49.99"),
            (BillingCycle::Quarterly, "90.00", "30.00"),
            (BillingCycle::Yearly, "120.00", "10.00"),
            (BillingCycle::Lifetime, "1200.00", "10.00"),
        ];
        for (cycle, price, expected) in cases {
            assert_eq!(cycle.monthly_price(d(price)).to_string(), expected, "{}", cycle);
        }
    }

    #[test]
    fn monthly_price_uses_bankers_rounding() {
        // 100 / 3 = 33.333.. and 0.30 / 12 = 0.025 -> 0.02
        assert_eq!(BillingCycle::Quarterly.monthly_price(d("100")).to_string(), "33.33");
        assert_eq!(BillingCycle::Yearly.monthly_price(d("0.30")).to_string(), "0.02");
    }

    #[test]
    fn monthly_price_of_zero_keeps_two_places() {
        assert_eq!(BillingCycle::Lifetime.monthly_price(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn filter_requires_active_for_featured_listing() {
        let plan = NewPlan {
            name: "Pro".to_string(),
            description: String::new(),
            plan_type: PlanType::Premium,
            billing_cycle: BillingCycle::Monthly,
            base_price: d("10"),
            setup_fee: Decimal::ZERO,
            max_loan_applications: 100,
            max_users: 5,
            max_storage_gb: 10,
            api_access: false,
            advanced_analytics: false,
            priority_support: false,
            white_label: false,
            custom_integrations: false,
            is_active: false,
            is_featured: true,
        }
        .into_plan(Uuid::new_v4(), Utc::now());

        let featured = ListPlansFilter {
            active_only: true,
            featured_only: true,
        };
        assert!(!featured.matches(&plan));
        assert!(ListPlansFilter::default().matches(&plan));
    }
}
