//! Invoice model.

use super::money::to_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Draft and sent invoices still await payment.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice raised against a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub subscription_id: Uuid,
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

impl Invoice {
    /// Date the invoice's revenue is attributed to.
    pub fn revenue_date(&self) -> DateTime<Utc> {
        self.paid_date.unwrap_or(self.issue_date)
    }
}

/// Invoice joined with its customer and plan names.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct InvoiceView {
    #[sqlx(flatten)]
    pub invoice: Invoice,
    pub customer_name: String,
    pub plan_name: String,
}

/// Total due when no explicit total is supplied.
pub fn invoice_total(subtotal: Decimal, tax_amount: Decimal, discount_amount: Decimal) -> Decimal {
    to_money(subtotal + tax_amount - discount_amount)
}

/// Invoice number in the form `{prefix}-{YYYYMMDD}-{8 hex}`.
pub fn generate_invoice_number(prefix: &str, issued: DateTime<Utc>, id: Uuid) -> String {
    let suffix = id.simple().to_string()[..8].to_uppercase();
    format!("{}-{}-{}", prefix, issued.format("%Y%m%d"), suffix)
}

/// Input for creating an invoice, defaults already applied.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub subscription_id: Uuid,
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
}

impl NewInvoice {
    pub fn into_invoice(self, id: Uuid, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            subscription_id: self.subscription_id,
            invoice_number: self.invoice_number,
            status: self.status,
            issue_date: self.issue_date,
            due_date: self.due_date,
            paid_date: self.paid_date,
            subtotal: to_money(self.subtotal),
            tax_amount: to_money(self.tax_amount),
            discount_amount: to_money(self.discount_amount),
            total_amount: to_money(self.total_amount),
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for listing invoices. An empty status list matches every status.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub statuses: Vec<InvoiceStatus>,
    pub subscription_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

impl ListInvoicesFilter {
    pub fn pending() -> Self {
        Self {
            statuses: vec![InvoiceStatus::Draft, InvoiceStatus::Sent],
            ..Default::default()
        }
    }

    pub fn status_strings(&self) -> Vec<String> {
        self.statuses.iter().map(|s| s.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn total_is_subtotal_plus_tax_minus_discount() {
        assert_eq!(
            invoice_total(d("100.00"), d("8.25"), d("10.00")).to_string(),
            "98.25"
        );
    }

    #[test]
    fn invoice_number_uses_prefix_date_and_hex() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        assert_eq!(generate_invoice_number("INV", issued, id), "INV-20240309-A1B2C3D4");
    }

    #[test]
    fn pending_covers_draft_and_sent() {
        assert!(InvoiceStatus::Draft.is_pending());
        assert!(InvoiceStatus::Sent.is_pending());
        assert!(!InvoiceStatus::Overdue.is_pending());
        assert_eq!(ListInvoicesFilter::pending().status_strings(), vec!["draft", "sent"]);
    }
}
