//! Storage abstraction shared by the Postgres and in-memory backends.

use crate::models::{
    AuditLog, AuditLogView, Customer, DashboardFacts, Invoice, InvoiceView, ListAuditLogsFilter,
    ListCustomersFilter, ListInvoicesFilter, ListPlansFilter, ListSubscriptionsFilter,
    NewAuditLog, NewCustomer, NewInvoice, NewPlan, NewSettings, NewSubscription, PricingPlan,
    PricingSettings, SettingsView, Subscription, SubscriptionView,
};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Persistence operations for every pricing entity.
///
/// Implementations enforce uniqueness, referential integrity, cascades and
/// the settings singleton themselves, reporting violations as field-level
/// validation errors (see [`Violation`]).
#[async_trait]
pub trait PricingStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Plans
    async fn create_plan(&self, input: &NewPlan) -> Result<PricingPlan, AppError>;
    async fn get_plan(&self, id: Uuid) -> Result<Option<PricingPlan>, AppError>;
    async fn list_plans(&self, filter: &ListPlansFilter) -> Result<Vec<PricingPlan>, AppError>;
    async fn update_plan(&self, plan: &PricingPlan) -> Result<PricingPlan, AppError>;
    /// Deletes the plan and its subscriptions. Returns false when absent.
    async fn delete_plan(&self, id: Uuid) -> Result<bool, AppError>;

    // Customers
    async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, AppError>;
    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError>;
    async fn list_customers(&self, filter: &ListCustomersFilter)
        -> Result<Vec<Customer>, AppError>;
    async fn update_customer(&self, customer: &Customer) -> Result<Customer, AppError>;
    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError>;

    // Subscriptions
    async fn create_subscription(&self, input: &NewSubscription)
        -> Result<Subscription, AppError>;
    async fn get_subscription(&self, id: Uuid) -> Result<Option<SubscriptionView>, AppError>;
    async fn list_subscriptions(
        &self,
        filter: &ListSubscriptionsFilter,
    ) -> Result<Vec<SubscriptionView>, AppError>;
    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, AppError>;
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, AppError>;

    // Invoices
    async fn create_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError>;
    async fn get_invoice(&self, id: Uuid) -> Result<Option<InvoiceView>, AppError>;
    async fn list_invoices(&self, filter: &ListInvoicesFilter)
        -> Result<Vec<InvoiceView>, AppError>;
    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, AppError>;
    async fn delete_invoice(&self, id: Uuid) -> Result<bool, AppError>;

    // Settings
    async fn get_settings(&self) -> Result<Option<SettingsView>, AppError>;
    /// Returns the settings record, inserting the defaults if none exists.
    async fn ensure_settings(&self) -> Result<SettingsView, AppError>;
    /// Fails with [`Violation::SettingsExist`] when a record already exists.
    async fn create_settings(&self, input: &NewSettings) -> Result<PricingSettings, AppError>;
    async fn update_settings(&self, settings: &PricingSettings)
        -> Result<PricingSettings, AppError>;

    // Audit trail
    async fn record_audit(&self, input: &NewAuditLog) -> Result<AuditLog, AppError>;
    async fn get_audit_log(&self, id: Uuid) -> Result<Option<AuditLogView>, AppError>;
    async fn list_audit_logs(
        &self,
        filter: &ListAuditLogsFilter,
    ) -> Result<Vec<AuditLogView>, AppError>;

    // Dashboard
    async fn dashboard_facts(&self) -> Result<DashboardFacts, AppError>;
}

/// Integrity violations both backends report the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    DuplicatePlanName,
    DuplicateCustomerEmail,
    DuplicateInvoiceNumber,
    SettingsExist,
    UnknownCustomer,
    UnknownPlan,
    UnknownSubscription,
    UnknownTrialPlan,
}

impl Violation {
    /// Map a Postgres constraint name to the violation it guards.
    pub fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "uq_pricing_plans_name" => Some(Self::DuplicatePlanName),
            "uq_customers_email" => Some(Self::DuplicateCustomerEmail),
            "uq_invoices_invoice_number" => Some(Self::DuplicateInvoiceNumber),
            "uq_pricing_settings_singleton" | "ck_pricing_settings_singleton" => {
                Some(Self::SettingsExist)
            }
            "fk_subscriptions_customer" => Some(Self::UnknownCustomer),
            "fk_subscriptions_plan" => Some(Self::UnknownPlan),
            "fk_invoices_subscription" => Some(Self::UnknownSubscription),
            "fk_pricing_settings_trial_plan" => Some(Self::UnknownTrialPlan),
            _ => None,
        }
    }

    fn field(&self) -> &'static str {
        match self {
            Self::DuplicatePlanName => "name",
            Self::DuplicateCustomerEmail => "email",
            Self::DuplicateInvoiceNumber => "invoice_number",
            Self::SettingsExist => "non_field_errors",
            Self::UnknownCustomer => "customer",
            Self::UnknownPlan => "plan",
            Self::UnknownSubscription => "subscription",
            Self::UnknownTrialPlan => "trial_plan",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::DuplicatePlanName | Self::DuplicateCustomerEmail | Self::DuplicateInvoiceNumber => {
                "unique"
            }
            Self::SettingsExist => "singleton",
            _ => "does_not_exist",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::DuplicatePlanName => "pricing plan with this name already exists.",
            Self::DuplicateCustomerEmail => "customer with this email already exists.",
            Self::DuplicateInvoiceNumber => "invoice with this invoice number already exists.",
            Self::SettingsExist => "Pricing settings already exist; update the existing record.",
            _ => "Invalid pk - object does not exist.",
        }
    }
}

impl From<Violation> for AppError {
    fn from(violation: Violation) -> Self {
        AppError::invalid_field(violation.field(), violation.code(), violation.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(
            Violation::from_constraint("uq_customers_email"),
            Some(Violation::DuplicateCustomerEmail)
        );
        assert_eq!(
            Violation::from_constraint("fk_subscriptions_plan"),
            Some(Violation::UnknownPlan)
        );
        assert_eq!(Violation::from_constraint("pricing_plans_pkey"), None);
    }

    #[test]
    fn violation_becomes_field_error() {
        let err: AppError = Violation::DuplicateInvoiceNumber.into();
        let AppError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.field_errors().contains_key("invoice_number"));
    }
}
