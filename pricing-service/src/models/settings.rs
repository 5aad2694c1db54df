//! Global pricing settings. Exactly one record exists at a time.

use super::money::to_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
        }
    }
}

/// The settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PricingSettings {
    pub id: Uuid,
    pub default_currency: Currency,
    pub tax_rate: Decimal,
    pub trial_days: i32,
    pub trial_plan_id: Option<Uuid>,
    pub invoice_prefix: String,
    pub invoice_notes: String,
    pub payment_terms_days: i32,
    pub allow_custom_pricing: bool,
    pub require_approval_for_custom: bool,
    pub auto_renewal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settings joined with the trial plan's name.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SettingsView {
    #[sqlx(flatten)]
    pub settings: PricingSettings,
    pub trial_plan_name: Option<String>,
}

/// Input for creating the settings record.
#[derive(Debug, Clone)]
pub struct NewSettings {
    pub default_currency: Currency,
    pub tax_rate: Decimal,
    pub trial_days: i32,
    pub trial_plan_id: Option<Uuid>,
    pub invoice_prefix: String,
    pub invoice_notes: String,
    pub payment_terms_days: i32,
    pub allow_custom_pricing: bool,
    pub require_approval_for_custom: bool,
    pub auto_renewal: bool,
}

impl Default for NewSettings {
    fn default() -> Self {
        Self {
            default_currency: Currency::Usd,
            tax_rate: Decimal::new(0, 2),
            trial_days: 14,
            trial_plan_id: None,
            invoice_prefix: "INV".to_string(),
            invoice_notes: String::new(),
            payment_terms_days: 30,
            allow_custom_pricing: true,
            require_approval_for_custom: true,
            auto_renewal: true,
        }
    }
}

impl NewSettings {
    pub fn into_settings(self, id: Uuid, now: DateTime<Utc>) -> PricingSettings {
        PricingSettings {
            id,
            default_currency: self.default_currency,
            tax_rate: to_money(self.tax_rate),
            trial_days: self.trial_days,
            trial_plan_id: self.trial_plan_id,
            invoice_prefix: self.invoice_prefix,
            invoice_notes: self.invoice_notes,
            payment_terms_days: self.payment_terms_days,
            allow_custom_pricing: self.allow_custom_pricing,
            require_approval_for_custom: self.require_approval_for_custom,
            auto_renewal: self.auto_renewal,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = NewSettings::default().into_settings(Uuid::new_v4(), Utc::now());
        assert_eq!(settings.default_currency, Currency::Usd);
        assert_eq!(settings.tax_rate.to_string(), "0.00");
        assert_eq!(settings.trial_days, 14);
        assert_eq!(settings.invoice_prefix, "INV");
        assert_eq!(settings.payment_terms_days, 30);
        assert!(settings.allow_custom_pricing);
        assert!(settings.require_approval_for_custom);
        assert!(settings.auto_renewal);
    }

    #[test]
    fn currency_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
        let parsed: Currency = serde_json::from_str("\"CAD\"").unwrap();
        assert_eq!(parsed, Currency::Cad);
    }
}
