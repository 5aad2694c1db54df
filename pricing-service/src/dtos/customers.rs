use crate::dtos::{double_option, SubscriptionResponse};
use crate::models::{Customer, CustomerStatus, CustomerType, NewCustomer};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

/// Billing email may be blank; otherwise it must be a valid address.
fn validate_billing_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some(Cow::Borrowed("Enter a valid email address."));
    Err(error)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub company_name: String,
    #[serde(default)]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    pub billing_email: Option<String>,
    #[serde(default)]
    pub tax_id: String,
}

impl CreateCustomerRequest {
    /// Derived rules plus the billing email check.
    pub fn validate_request(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();
        if let Some(email) = &self.billing_email {
            if let Err(e) = validate_billing_email(email) {
                errors.add("billing_email", e);
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<CreateCustomerRequest> for NewCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            company_name: req.company_name,
            customer_type: req.customer_type,
            status: req.status,
            address_line1: req.address_line1,
            address_line2: req.address_line2,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            billing_email: req.billing_email.filter(|e| !e.is_empty()),
            tax_id: req.tax_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company_name: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub billing_email: Option<Option<String>>,
    pub tax_id: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn validate_request(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();
        if let Some(Some(email)) = &self.billing_email {
            if let Err(e) = validate_billing_email(email) {
                errors.add("billing_email", e);
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn apply(self, customer: &mut Customer) {
        if let Some(v) = self.name {
            customer.name = v;
        }
        if let Some(v) = self.email {
            customer.email = v;
        }
        if let Some(v) = self.phone {
            customer.phone = v;
        }
        if let Some(v) = self.company_name {
            customer.company_name = v;
        }
        if let Some(v) = self.customer_type {
            customer.customer_type = v;
        }
        if let Some(v) = self.status {
            customer.status = v;
        }
        if let Some(v) = self.address_line1 {
            customer.address_line1 = v;
        }
        if let Some(v) = self.address_line2 {
            customer.address_line2 = v;
        }
        if let Some(v) = self.city {
            customer.city = v;
        }
        if let Some(v) = self.state {
            customer.state = v;
        }
        if let Some(v) = self.postal_code {
            customer.postal_code = v;
        }
        if let Some(v) = self.country {
            customer.country = v;
        }
        if let Some(v) = self.billing_email {
            customer.billing_email = v.filter(|e| !e.is_empty());
        }
        if let Some(v) = self.tax_id {
            customer.tax_id = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub customer_type: CustomerType,
    pub status: CustomerStatus,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub billing_email: Option<String>,
    pub tax_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            company_name: c.company_name,
            customer_type: c.customer_type,
            status: c.status,
            address_line1: c.address_line1,
            address_line2: c.address_line2,
            city: c.city,
            state: c.state,
            postal_code: c.postal_code,
            country: c.country,
            billing_email: c.billing_email,
            tax_id: c.tax_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Customer with subscriptions and spend, returned by `GET /api/customers/{id}/`.
#[derive(Debug, Serialize)]
pub struct CustomerDetailResponse {
    #[serde(flatten)]
    pub customer: CustomerResponse,
    pub subscriptions: Vec<SubscriptionResponse>,
    pub active_subscriptions: usize,
    pub total_spent: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_billing_email_is_accepted() {
        let req: CreateCustomerRequest = serde_json::from_str(
            r#"{"name": "Acme", "email": "ops@acme.test", "billing_email": ""}"#,
        )
        .unwrap();
        assert!(req.validate_request().is_ok());
        assert_eq!(NewCustomer::from(req).billing_email, None);
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let req: CreateCustomerRequest = serde_json::from_str(
            r#"{"name": "Acme", "email": "not-an-email", "billing_email": "also bad"}"#,
        )
        .unwrap();
        let errors = req.validate_request().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("billing_email"));
    }

    #[test]
    fn explicit_null_clears_billing_email() {
        let mut customer = NewCustomer::from(
            serde_json::from_str::<CreateCustomerRequest>(
                r#"{"name": "Acme", "email": "ops@acme.test", "billing_email": "ap@acme.test"}"#,
            )
            .unwrap(),
        )
        .into_customer(Uuid::new_v4(), Utc::now());

        let patch: UpdateCustomerRequest =
            serde_json::from_str(r#"{"billing_email": null}"#).unwrap();
        patch.apply(&mut customer);
        assert_eq!(customer.billing_email, None);
    }
}
