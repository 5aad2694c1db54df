//! Subscription model.

use super::money::to_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    Expired,
    #[default]
    Trial,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Trial => "trial",
        }
    }

    /// Whether the subscription counts towards plan popularity.
    pub fn is_engaged(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer's enrollment in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub custom_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub current_loan_applications: i32,
    pub current_users: i32,
    pub current_storage_gb: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription joined with the names and price of its customer and plan.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SubscriptionView {
    #[sqlx(flatten)]
    pub subscription: Subscription,
    pub customer_name: String,
    pub plan_name: String,
    pub plan_base_price: Decimal,
}

impl SubscriptionView {
    pub fn effective_price(&self) -> Decimal {
        effective_price(
            self.plan_base_price,
            self.subscription.custom_price,
            self.subscription.discount_percentage,
        )
    }
}

/// Price actually charged: the custom override (or plan price) minus the discount.
///
/// A zero custom price is not an override; the plan price applies.
pub fn effective_price(
    base_price: Decimal,
    custom_price: Option<Decimal>,
    discount_percentage: Decimal,
) -> Decimal {
    let base = custom_price.filter(|p| !p.is_zero()).unwrap_or(base_price);
    let remaining = Decimal::ONE_HUNDRED - discount_percentage;
    to_money(base * remaining / Decimal::ONE_HUNDRED)
}

/// Share of the plan's loan application limit already consumed, in percent.
pub fn usage_percentage(current_loan_applications: i32, max_loan_applications: i32) -> f64 {
    if max_loan_applications <= 0 {
        return 0.0;
    }
    f64::from(current_loan_applications) / f64::from(max_loan_applications) * 100.0
}

/// Input for creating a subscription, defaults already applied.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub custom_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub current_loan_applications: i32,
    pub current_users: i32,
    pub current_storage_gb: i32,
}

impl NewSubscription {
    pub fn into_subscription(self, id: Uuid, now: DateTime<Utc>) -> Subscription {
        Subscription {
            id,
            customer_id: self.customer_id,
            plan_id: self.plan_id,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            trial_end_date: self.trial_end_date,
            custom_price: self.custom_price.map(to_money),
            discount_percentage: to_money(self.discount_percentage),
            current_loan_applications: self.current_loan_applications,
            current_users: self.current_users,
            current_storage_gb: self.current_storage_gb,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing subscriptions.
#[derive(Debug, Clone, Default)]
pub struct ListSubscriptionsFilter {
    pub status: Option<SubscriptionStatus>,
    pub customer_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
}

impl ListSubscriptionsFilter {
    pub fn matches(&self, subscription: &Subscription) -> bool {
        self.status.map_or(true, |s| subscription.status == s)
            && self.customer_id.map_or(true, |id| subscription.customer_id == id)
            && self.plan_id.map_or(true, |id| subscription.plan_id == id)
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
    fn effective_price_applies_discount() {
        assert_eq!(effective_price(d("50.00"), None, d("20.00")).to_string(), "40.00");
    }

    #[test]
    fn effective_price_without_discount_is_base() {
        assert_eq!(effective_price(d("49.99"), None, d("0.00")), d("49.99"));
        assert_eq!(effective_price(d("49.99"), None, d("0.00")).to_string(), "49.99");
    }

    #[test]
    fn full_discount_is_free() {
        assert_eq!(effective_price(d("49.99"), None, d("100.00")).to_string(), "0.00");
    }

    #[test]
    fn custom_price_overrides_plan_price() {
        assert_eq!(
            effective_price(d("99.00"), Some(d("80.00")), d("10.00")).to_string(),
            "72.00"
        );
    }

    #[test]
    fn zero_custom_price_falls_back_to_plan_price() {
        assert_eq!(
            effective_price(d("50.00"), Some(d("0.00")), d("20.00")).to_string(),
            "40.00"
        );
    }

    #[test]
    fn effective_price_rounds_half_even() {
        // 10.05 * 0.5 = 5.025
        assert_eq!(effective_price(d("10.05"), None, d("50")).to_string(), "5.02");
    }

    #[test]
    fn usage_percentage_handles_zero_limit() {
        assert_eq!(usage_percentage(5, 0), 0.0);
        assert_eq!(usage_percentage(25, 100), 25.0);
    }

    #[test]
    fn trial_is_default_status() {
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Trial);
        assert!(SubscriptionStatus::Trial.is_engaged());
        assert!(!SubscriptionStatus::Cancelled.is_engaged());
    }
}
