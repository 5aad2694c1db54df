//! Services module for pricing-service.

pub mod audit;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics, record_entity_operation};
pub use store::{PricingStore, Violation};
