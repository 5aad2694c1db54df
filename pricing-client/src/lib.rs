//! Typed HTTP client for pricing-service.
//!
//! ```no_run
//! # async fn run() -> Result<(), pricing_client::ClientError> {
//! let client = pricing_client::PricingClient::from_env()?;
//! let plans = client.get_active_plans().await?;
//! println!("{} active plans", plans.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod types;

pub use client::PricingClient;
pub use config::PricingClientConfig;
pub use error::ClientError;
