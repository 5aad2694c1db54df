use crate::dtos::double_option;
use crate::models::money::{to_money, validate_money};
use crate::models::{
    generate_invoice_number, invoice_total, Invoice, InvoiceStatus, InvoiceView, NewInvoice,
    PricingSettings,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub subscription: Uuid,
    #[validate(length(min = 1, max = 50, message = "Invoice number must be 1 to 50 characters"))]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "validate_money"))]
    pub subtotal: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_money"))]
    pub tax_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_money"))]
    pub discount_amount: Decimal,
    #[validate(custom(function = "validate_money"))]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

impl CreateInvoiceRequest {
    /// Fill the number, dates and total from the pricing settings.
    pub fn into_new_invoice(
        self,
        settings: &PricingSettings,
        now: DateTime<Utc>,
    ) -> Result<NewInvoice, AppError> {
        let issue_date = self.issue_date.unwrap_or(now);
        let due_date = self
            .due_date
            .unwrap_or_else(|| issue_date + Duration::days(i64::from(settings.payment_terms_days)));

        let total_amount = match self.total_amount {
            Some(total) => total,
            None => {
                let total = invoice_total(self.subtotal, self.tax_amount, self.discount_amount);
                if total < Decimal::ZERO {
                    return Err(AppError::invalid_field(
                        "total_amount",
                        "min_value",
                        "Discount exceeds subtotal plus tax; total cannot be negative.",
                    ));
                }
                total
            }
        };

        let invoice_number = match self.invoice_number {
            Some(number) => number,
            None => generate_invoice_number(&settings.invoice_prefix, issue_date, Uuid::new_v4()),
        };

        let paid_date = match (self.status, self.paid_date) {
            (InvoiceStatus::Paid, None) => Some(now),
            (_, paid) => paid,
        };

        Ok(NewInvoice {
            subscription_id: self.subscription,
            invoice_number,
            status: self.status,
            issue_date,
            due_date,
            paid_date,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total_amount,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub subscription: Option<Uuid>,
    #[validate(length(min = 1, max = 50, message = "Invoice number must be 1 to 50 characters"))]
    pub invoice_number: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub paid_date: Option<Option<DateTime<Utc>>>,
    #[validate(custom(function = "validate_money"))]
    pub subtotal: Option<Decimal>,
    #[validate(custom(function = "validate_money"))]
    pub tax_amount: Option<Decimal>,
    #[validate(custom(function = "validate_money"))]
    pub discount_amount: Option<Decimal>,
    #[validate(custom(function = "validate_money"))]
    pub total_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl UpdateInvoiceRequest {
    /// Overwrite the fields present in the request. An invoice moved to paid
    /// without a payment date is stamped with `now`.
    pub fn apply(self, invoice: &mut Invoice, now: DateTime<Utc>) {
        if let Some(v) = self.subscription {
            invoice.subscription_id = v;
        }
        if let Some(v) = self.invoice_number {
            invoice.invoice_number = v;
        }
        if let Some(v) = self.status {
            invoice.status = v;
        }
        if let Some(v) = self.issue_date {
            invoice.issue_date = v;
        }
        if let Some(v) = self.due_date {
            invoice.due_date = v;
        }
        if let Some(v) = self.paid_date {
            invoice.paid_date = v;
        }
        if let Some(v) = self.subtotal {
            invoice.subtotal = to_money(v);
        }
        if let Some(v) = self.tax_amount {
            invoice.tax_amount = to_money(v);
        }
        if let Some(v) = self.discount_amount {
            invoice.discount_amount = to_money(v);
        }
        if let Some(v) = self.total_amount {
            invoice.total_amount = to_money(v);
        }
        if let Some(v) = self.notes {
            invoice.notes = v;
        }
        if invoice.status == InvoiceStatus::Paid && invoice.paid_date.is_none() {
            invoice.paid_date = Some(now);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub subscription: Uuid,
    pub subscription_id: Uuid,
    pub customer_name: String,
    pub plan_name: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InvoiceView> for InvoiceResponse {
    fn from(view: InvoiceView) -> Self {
        let i = view.invoice;
        Self {
            id: i.id,
            subscription: i.subscription_id,
            subscription_id: i.subscription_id,
            customer_name: view.customer_name,
            plan_name: view.plan_name,
            invoice_number: i.invoice_number,
            status: i.status,
            issue_date: i.issue_date,
            due_date: i.due_date,
            paid_date: i.paid_date,
            subtotal: i.subtotal,
            tax_amount: i.tax_amount,
            discount_amount: i.discount_amount,
            total_amount: i.total_amount,
            notes: i.notes,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSettings;
    use chrono::TimeZone;
    use serde_json::json;

    fn settings() -> PricingSettings {
        NewSettings {
            invoice_prefix: "ACME".to_string(),
            payment_terms_days: 15,
            ..Default::default()
        }
        .into_settings(Uuid::new_v4(), Utc::now())
    }

    fn request(body: serde_json::Value) -> CreateInvoiceRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn defaults_come_from_settings() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap();
        let req = request(json!({
            "subscription": Uuid::new_v4(),
            "subtotal": "100.00",
            "tax_amount": "8.00",
            "discount_amount": "3.00"
        }));

        let invoice = req.into_new_invoice(&settings(), now).unwrap();
        assert!(invoice.invoice_number.starts_with("ACME-20240520-"));
        assert_eq!(invoice.invoice_number.len(), "ACME-20240520-".len() + 8);
        assert_eq!(invoice.issue_date, now);
        assert_eq!(invoice.due_date, now + Duration::days(15));
        assert_eq!(invoice.total_amount.to_string(), "105.00");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!(invoice.paid_date.is_none());
    }

    #[test]
    fn explicit_values_are_kept() {
        let req = request(json!({
            "subscription": Uuid::new_v4(),
            "invoice_number": "MANUAL-1",
            "subtotal": "10.00",
            "total_amount": "12.00"
        }));
        let invoice = req.into_new_invoice(&settings(), Utc::now()).unwrap();
        assert_eq!(invoice.invoice_number, "MANUAL-1");
        assert_eq!(invoice.total_amount.to_string(), "12.00");
    }

    #[test]
    fn derived_total_cannot_be_negative() {
        let req = request(json!({
            "subscription": Uuid::new_v4(),
            "subtotal": "10.00",
            "discount_amount": "20.00"
        }));
        let err = req.into_new_invoice(&settings(), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn paying_an_invoice_stamps_paid_date() {
        let now = Utc::now();
        let mut invoice = request(json!({
            "subscription": Uuid::new_v4(),
            "subtotal": "10.00"
        }))
        .into_new_invoice(&settings(), now)
        .unwrap()
        .into_invoice(Uuid::new_v4(), now);

        let update: UpdateInvoiceRequest = serde_json::from_str(r#"{"status": "paid"}"#).unwrap();
        update.apply(&mut invoice, now);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_date, Some(now));
    }
}
