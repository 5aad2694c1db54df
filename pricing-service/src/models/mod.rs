//! Domain models for pricing-service.

mod audit_log;
mod customer;
mod dashboard;
mod invoice;
pub mod money;
mod plan;
mod settings;
mod subscription;

pub use audit_log::{AuditAction, AuditLog, AuditLogView, ListAuditLogsFilter, NewAuditLog};
pub use customer::{Customer, CustomerStatus, CustomerType, ListCustomersFilter, NewCustomer};
pub use dashboard::{
    summarize, DashboardFacts, DashboardSummary, MonthlyRevenue, RevenueBucket, TREND_MONTHS,
};
pub use invoice::{
    generate_invoice_number, invoice_total, Invoice, InvoiceStatus, InvoiceView,
    ListInvoicesFilter, NewInvoice,
};
pub use plan::{BillingCycle, ListPlansFilter, NewPlan, PlanType, PricingPlan};
pub use settings::{Currency, NewSettings, PricingSettings, SettingsView};
pub use subscription::{
    effective_price, usage_percentage, ListSubscriptionsFilter, NewSubscription, Subscription,
    SubscriptionStatus, SubscriptionView,
};
