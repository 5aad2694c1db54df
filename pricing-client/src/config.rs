use crate::error::ClientError;
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PricingClientConfig {
    /// Service root, without the `/api` suffix.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for PricingClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PricingClientConfig {
    /// Read `PRICING_SERVICE_URL`, `PRICING_SERVICE_TOKEN` and
    /// `PRICING_SERVICE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        let timeout = match env::var("PRICING_SERVICE_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ClientError::Config(format!("Invalid PRICING_SERVICE_TIMEOUT_SECS: {}", e))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: env::var("PRICING_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            token: env::var("PRICING_SERVICE_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(timeout),
        })
    }
}
