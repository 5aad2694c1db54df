pub mod audit_logs;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod plans;
pub mod settings;
pub mod subscriptions;

pub use health::{health_check, metrics_handler, readiness_check, service_info};
