use crate::dtos::double_option;
use crate::models::money::{to_money, validate_percentage};
use crate::models::{Currency, NewSettings, PricingSettings, SettingsView};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Body of every settings write. Absent fields keep their current (or
/// default) value; `trial_plan: null` clears the trial plan.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SettingsRequest {
    pub default_currency: Option<Currency>,
    #[validate(custom(function = "validate_percentage"))]
    pub tax_rate: Option<Decimal>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub trial_days: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub trial_plan: Option<Option<Uuid>>,
    #[validate(length(min = 1, max = 10, message = "Invoice prefix must be 1 to 10 characters"))]
    pub invoice_prefix: Option<String>,
    pub invoice_notes: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub payment_terms_days: Option<i32>,
    pub allow_custom_pricing: Option<bool>,
    pub require_approval_for_custom: Option<bool>,
    pub auto_renewal: Option<bool>,
}

impl SettingsRequest {
    pub fn into_new_settings(self) -> NewSettings {
        let defaults = NewSettings::default();
        NewSettings {
            default_currency: self.default_currency.unwrap_or(defaults.default_currency),
            tax_rate: self.tax_rate.unwrap_or(defaults.tax_rate),
            trial_days: self.trial_days.unwrap_or(defaults.trial_days),
            trial_plan_id: self.trial_plan.flatten(),
            invoice_prefix: self.invoice_prefix.unwrap_or(defaults.invoice_prefix),
            invoice_notes: self.invoice_notes.unwrap_or(defaults.invoice_notes),
            payment_terms_days: self.payment_terms_days.unwrap_or(defaults.payment_terms_days),
            allow_custom_pricing: self
                .allow_custom_pricing
                .unwrap_or(defaults.allow_custom_pricing),
            require_approval_for_custom: self
                .require_approval_for_custom
                .unwrap_or(defaults.require_approval_for_custom),
            auto_renewal: self.auto_renewal.unwrap_or(defaults.auto_renewal),
        }
    }

    pub fn apply(self, settings: &mut PricingSettings) {
        if let Some(v) = self.default_currency {
            settings.default_currency = v;
        }
        if let Some(v) = self.tax_rate {
            settings.tax_rate = to_money(v);
        }
        if let Some(v) = self.trial_days {
            settings.trial_days = v;
        }
        if let Some(v) = self.trial_plan {
            settings.trial_plan_id = v;
        }
        if let Some(v) = self.invoice_prefix {
            settings.invoice_prefix = v;
        }
        if let Some(v) = self.invoice_notes {
            settings.invoice_notes = v;
        }
        if let Some(v) = self.payment_terms_days {
            settings.payment_terms_days = v;
        }
        if let Some(v) = self.allow_custom_pricing {
            settings.allow_custom_pricing = v;
        }
        if let Some(v) = self.require_approval_for_custom {
            settings.require_approval_for_custom = v;
        }
        if let Some(v) = self.auto_renewal {
            settings.auto_renewal = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub id: Uuid,
    pub default_currency: Currency,
    pub tax_rate: Decimal,
    pub trial_days: i32,
    pub trial_plan: Option<Uuid>,
    pub trial_plan_name: Option<String>,
    pub invoice_prefix: String,
    pub invoice_notes: String,
    pub payment_terms_days: i32,
    pub allow_custom_pricing: bool,
    pub require_approval_for_custom: bool,
    pub auto_renewal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingsView> for SettingsResponse {
    fn from(view: SettingsView) -> Self {
        let s = view.settings;
        Self {
            id: s.id,
            default_currency: s.default_currency,
            tax_rate: s.tax_rate,
            trial_days: s.trial_days,
            trial_plan: s.trial_plan_id,
            trial_plan_name: view.trial_plan_name,
            invoice_prefix: s.invoice_prefix,
            invoice_notes: s.invoice_notes,
            payment_terms_days: s.payment_terms_days,
            allow_custom_pricing: s.allow_custom_pricing,
            require_approval_for_custom: s.require_approval_for_custom,
            auto_renewal: s.auto_renewal,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
