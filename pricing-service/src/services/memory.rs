//! In-memory store.
//!
//! Holds every entity behind a single `RwLock`, so each write is applied
//! atomically together with its integrity checks and cascades. Suitable for
//! development, tests and single-instance demos; nothing survives a restart.

use crate::models::{
    AuditLog, AuditLogView, Customer, DashboardFacts, Invoice, InvoiceStatus,
    InvoiceView, ListAuditLogsFilter, ListCustomersFilter, ListInvoicesFilter, ListPlansFilter,
    ListSubscriptionsFilter, NewAuditLog, NewCustomer, NewInvoice, NewPlan, NewSettings,
    NewSubscription, PricingPlan, PricingSettings, RevenueBucket, SettingsView, Subscription,
    SubscriptionStatus, SubscriptionView,
};
use crate::services::store::{PricingStore, Violation};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Default)]
struct State {
    plans: Vec<PricingPlan>,
    customers: Vec<Customer>,
    subscriptions: Vec<Subscription>,
    invoices: Vec<Invoice>,
    settings: Option<PricingSettings>,
    audit_logs: Vec<AuditLog>,
}

impl State {
    fn plan(&self, id: Uuid) -> Option<&PricingPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    fn customer(&self, id: Uuid) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    fn subscription(&self, id: Uuid) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.id == id)
    }

    fn subscription_view(&self, subscription: &Subscription) -> Option<SubscriptionView> {
        let customer = self.customer(subscription.customer_id)?;
        let plan = self.plan(subscription.plan_id)?;
        Some(SubscriptionView {
            subscription: subscription.clone(),
            customer_name: customer.name.clone(),
            plan_name: plan.name.clone(),
            plan_base_price: plan.base_price,
        })
    }

    fn invoice_view(&self, invoice: &Invoice) -> Option<InvoiceView> {
        let subscription = self.subscription(invoice.subscription_id)?;
        let view = self.subscription_view(subscription)?;
        Some(InvoiceView {
            invoice: invoice.clone(),
            customer_name: view.customer_name,
            plan_name: view.plan_name,
        })
    }

    fn settings_view(&self) -> Option<SettingsView> {
        let settings = self.settings.clone()?;
        let trial_plan_name = settings
            .trial_plan_id
            .and_then(|id| self.plan(id))
            .map(|p| p.name.clone());
        Some(SettingsView {
            settings,
            trial_plan_name,
        })
    }

    fn audit_view(&self, log: &AuditLog) -> AuditLogView {
        AuditLogView {
            log: log.clone(),
            plan_name: log.plan_id.and_then(|id| self.plan(id)).map(|p| p.name.clone()),
            customer_name: log
                .customer_id
                .and_then(|id| self.customer(id))
                .map(|c| c.name.clone()),
        }
    }

    fn check_subscription_refs(&self, customer_id: Uuid, plan_id: Uuid) -> Result<(), AppError> {
        if self.customer(customer_id).is_none() {
            return Err(Violation::UnknownCustomer.into());
        }
        if self.plan(plan_id).is_none() {
            return Err(Violation::UnknownPlan.into());
        }
        Ok(())
    }

    fn check_trial_plan(&self, trial_plan_id: Option<Uuid>) -> Result<(), AppError> {
        match trial_plan_id {
            Some(id) if self.plan(id).is_none() => Err(Violation::UnknownTrialPlan.into()),
            _ => Ok(()),
        }
    }

    /// Remove subscriptions matching `predicate` along with their invoices.
    fn remove_subscriptions(&mut self, predicate: impl Fn(&Subscription) -> bool) {
        let removed: HashSet<Uuid> = self
            .subscriptions
            .iter()
            .filter(|&s| predicate(s))
            .map(|s| s.id)
            .collect();
        if removed.is_empty() {
            return;
        }
        self.subscriptions.retain(|s| !removed.contains(&s.id));
        self.remove_invoices(|i| removed.contains(&i.subscription_id));
        for log in &mut self.audit_logs {
            if log.subscription_id.is_some_and(|id| removed.contains(&id)) {
                log.subscription_id = None;
            }
        }
    }

    fn remove_invoices(&mut self, predicate: impl Fn(&Invoice) -> bool) {
        let removed: HashSet<Uuid> = self
            .invoices
            .iter()
            .filter(|&i| predicate(i))
            .map(|i| i.id)
            .collect();
        self.invoices.retain(|i| !removed.contains(&i.id));
        for log in &mut self.audit_logs {
            if log.invoice_id.is_some_and(|id| removed.contains(&id)) {
                log.invoice_id = None;
            }
        }
    }
}

/// Newest first; ties keep the most recently inserted record first.
fn newest_first<T: Clone>(items: &[T], created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut sorted: Vec<T> = items.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| created(b).cmp(&created(a)));
    sorted
}

fn month_of(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// In-memory [`PricingStore`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PricingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    // Plans

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_plan(&self, input: &NewPlan) -> Result<PricingPlan, AppError> {
        let mut state = self.state.write().await;
        if state.plans.iter().any(|p| p.name == input.name) {
            return Err(Violation::DuplicatePlanName.into());
        }

        let plan = input.clone().into_plan(Uuid::new_v4(), Utc::now());
        state.plans.push(plan.clone());
        info!(plan_id = %plan.id, name = %plan.name, "Plan created");
        Ok(plan)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<PricingPlan>, AppError> {
        Ok(self.state.read().await.plan(id).cloned())
    }

    async fn list_plans(&self, filter: &ListPlansFilter) -> Result<Vec<PricingPlan>, AppError> {
        let state = self.state.read().await;
        let mut plans: Vec<PricingPlan> = state
            .plans
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        plans.sort_by(|a, b| {
            a.base_price
                .cmp(&b.base_price)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(plans)
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn update_plan(&self, plan: &PricingPlan) -> Result<PricingPlan, AppError> {
        let mut state = self.state.write().await;
        if state
            .plans
            .iter()
            .any(|p| p.id != plan.id && p.name == plan.name)
        {
            return Err(Violation::DuplicatePlanName.into());
        }

        let slot = state
            .plans
            .iter_mut()
            .find(|p| p.id == plan.id)
            .ok_or_else(|| AppError::not_found("Plan"))?;
        *slot = PricingPlan {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..plan.clone()
        };
        Ok(slot.clone())
    }

    #[instrument(skip(self))]
    async fn delete_plan(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.plans.len();
        state.plans.retain(|p| p.id != id);
        if state.plans.len() == before {
            return Ok(false);
        }

        state.remove_subscriptions(|s| s.plan_id == id);
        if let Some(settings) = state.settings.as_mut() {
            if settings.trial_plan_id == Some(id) {
                settings.trial_plan_id = None;
            }
        }
        for log in &mut state.audit_logs {
            if log.plan_id == Some(id) {
                log.plan_id = None;
            }
        }
        Ok(true)
    }

    // Customers

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, AppError> {
        let mut state = self.state.write().await;
        if state.customers.iter().any(|c| c.email == input.email) {
            return Err(Violation::DuplicateCustomerEmail.into());
        }

        let customer = input.clone().into_customer(Uuid::new_v4(), Utc::now());
        state.customers.push(customer.clone());
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.state.read().await.customer(id).cloned())
    }

    async fn list_customers(
        &self,
        filter: &ListCustomersFilter,
    ) -> Result<Vec<Customer>, AppError> {
        let state = self.state.read().await;
        let mut customers: Vec<Customer> = state
            .customers
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn update_customer(&self, customer: &Customer) -> Result<Customer, AppError> {
        let mut state = self.state.write().await;
        if state
            .customers
            .iter()
            .any(|c| c.id != customer.id && c.email == customer.email)
        {
            return Err(Violation::DuplicateCustomerEmail.into());
        }

        let slot = state
            .customers
            .iter_mut()
            .find(|c| c.id == customer.id)
            .ok_or_else(|| AppError::not_found("Customer"))?;
        *slot = Customer {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..customer.clone()
        };
        Ok(slot.clone())
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.customers.len();
        state.customers.retain(|c| c.id != id);
        if state.customers.len() == before {
            return Ok(false);
        }

        state.remove_subscriptions(|s| s.customer_id == id);
        for log in &mut state.audit_logs {
            if log.customer_id == Some(id) {
                log.customer_id = None;
            }
        }
        Ok(true)
    }

    // Subscriptions

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id, plan_id = %input.plan_id))]
    async fn create_subscription(
        &self,
        input: &NewSubscription,
    ) -> Result<Subscription, AppError> {
        let mut state = self.state.write().await;
        state.check_subscription_refs(input.customer_id, input.plan_id)?;

        let subscription = input.clone().into_subscription(Uuid::new_v4(), Utc::now());
        state.subscriptions.push(subscription.clone());
        info!(subscription_id = %subscription.id, status = %subscription.status, "Subscription created");
        Ok(subscription)
    }

    async fn get_subscription(&self, id: Uuid) -> Result<Option<SubscriptionView>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .subscription(id)
            .and_then(|s| state.subscription_view(s)))
    }

    async fn list_subscriptions(
        &self,
        filter: &ListSubscriptionsFilter,
    ) -> Result<Vec<SubscriptionView>, AppError> {
        let state = self.state.read().await;
        let matching: Vec<Subscription> = state
            .subscriptions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |s| s.created_at)
            .iter()
            .filter_map(|s| state.subscription_view(s))
            .collect())
    }

    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, AppError> {
        let mut state = self.state.write().await;
        state.check_subscription_refs(subscription.customer_id, subscription.plan_id)?;

        let slot = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| AppError::not_found("Subscription"))?;
        *slot = Subscription {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..subscription.clone()
        };
        Ok(slot.clone())
    }

    #[instrument(skip(self))]
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        if state.subscription(id).is_none() {
            return Ok(false);
        }
        state.remove_subscriptions(|s| s.id == id);
        Ok(true)
    }

    // Invoices

    #[instrument(skip(self, input), fields(subscription_id = %input.subscription_id))]
    async fn create_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        let mut state = self.state.write().await;
        if state.subscription(input.subscription_id).is_none() {
            return Err(Violation::UnknownSubscription.into());
        }
        if state
            .invoices
            .iter()
            .any(|i| i.invoice_number == input.invoice_number)
        {
            return Err(Violation::DuplicateInvoiceNumber.into());
        }

        let invoice = input.clone().into_invoice(Uuid::new_v4(), Utc::now());
        state.invoices.push(invoice.clone());
        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Invoice created"
        );
        Ok(invoice)
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<InvoiceView>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .find(|i| i.id == id)
            .and_then(|i| state.invoice_view(i)))
    }

    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceView>, AppError> {
        let state = self.state.read().await;
        let matching: Vec<Invoice> = state
            .invoices
            .iter()
            .filter(|i| filter.statuses.is_empty() || filter.statuses.contains(&i.status))
            .filter(|i| filter.subscription_id.map_or(true, |id| i.subscription_id == id))
            .filter(|i| {
                filter.customer_id.map_or(true, |customer_id| {
                    state
                        .subscription(i.subscription_id)
                        .is_some_and(|s| s.customer_id == customer_id)
                })
            })
            .cloned()
            .collect();
        Ok(newest_first(&matching, |i| i.created_at)
            .iter()
            .filter_map(|i| state.invoice_view(i))
            .collect())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let mut state = self.state.write().await;
        if state.subscription(invoice.subscription_id).is_none() {
            return Err(Violation::UnknownSubscription.into());
        }
        if state
            .invoices
            .iter()
            .any(|i| i.id != invoice.id && i.invoice_number == invoice.invoice_number)
        {
            return Err(Violation::DuplicateInvoiceNumber.into());
        }

        let slot = state
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| AppError::not_found("Invoice"))?;
        *slot = Invoice {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..invoice.clone()
        };
        Ok(slot.clone())
    }

    #[instrument(skip(self))]
    async fn delete_invoice(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let before = state.invoices.len();
        state.remove_invoices(|i| i.id == id);
        Ok(state.invoices.len() < before)
    }

    // Settings

    async fn get_settings(&self) -> Result<Option<SettingsView>, AppError> {
        Ok(self.state.read().await.settings_view())
    }

    #[instrument(skip(self))]
    async fn ensure_settings(&self) -> Result<SettingsView, AppError> {
        let mut state = self.state.write().await;
        if state.settings.is_none() {
            state.settings = Some(NewSettings::default().into_settings(Uuid::new_v4(), Utc::now()));
            info!("Default pricing settings created");
        }
        state
            .settings_view()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Settings missing after insert")))
    }

    #[instrument(skip(self, input))]
    async fn create_settings(&self, input: &NewSettings) -> Result<PricingSettings, AppError> {
        let mut state = self.state.write().await;
        if state.settings.is_some() {
            return Err(Violation::SettingsExist.into());
        }
        state.check_trial_plan(input.trial_plan_id)?;

        let settings = input.clone().into_settings(Uuid::new_v4(), Utc::now());
        state.settings = Some(settings.clone());
        info!(settings_id = %settings.id, "Pricing settings created");
        Ok(settings)
    }

    #[instrument(skip(self, settings), fields(settings_id = %settings.id))]
    async fn update_settings(
        &self,
        settings: &PricingSettings,
    ) -> Result<PricingSettings, AppError> {
        let mut state = self.state.write().await;
        state.check_trial_plan(settings.trial_plan_id)?;

        let slot = state
            .settings
            .as_mut()
            .filter(|s| s.id == settings.id)
            .ok_or_else(|| AppError::not_found("Pricing settings"))?;
        *slot = PricingSettings {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..settings.clone()
        };
        Ok(slot.clone())
    }

    // Audit trail

    async fn record_audit(&self, input: &NewAuditLog) -> Result<AuditLog, AppError> {
        let mut state = self.state.write().await;
        let log = input.clone().into_log(Uuid::new_v4(), Utc::now());
        state.audit_logs.push(log.clone());
        Ok(log)
    }

    async fn get_audit_log(&self, id: Uuid) -> Result<Option<AuditLogView>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .audit_logs
            .iter()
            .find(|l| l.id == id)
            .map(|l| state.audit_view(l)))
    }

    async fn list_audit_logs(
        &self,
        filter: &ListAuditLogsFilter,
    ) -> Result<Vec<AuditLogView>, AppError> {
        let state = self.state.read().await;
        let matching: Vec<AuditLog> = state
            .audit_logs
            .iter()
            .filter(|l| filter.action_type.map_or(true, |a| l.action_type == a))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |l| l.timestamp)
            .iter()
            .map(|l| state.audit_view(l))
            .collect())
    }

    // Dashboard

    async fn dashboard_facts(&self) -> Result<DashboardFacts, AppError> {
        let state = self.state.read().await;

        let count_subscriptions = |status: SubscriptionStatus| {
            state
                .subscriptions
                .iter()
                .filter(|s| s.status == status)
                .count() as i64
        };

        let mut engaged: HashMap<Uuid, i64> = HashMap::new();
        for subscription in state.subscriptions.iter().filter(|s| s.status.is_engaged()) {
            *engaged.entry(subscription.plan_id).or_default() += 1;
        }
        let popular_plan = engaged
            .iter()
            .filter_map(|(plan_id, count)| state.plan(*plan_id).map(|p| (p.name.clone(), *count)))
            .max_by(|(name_a, count_a), (name_b, count_b)| {
                count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
            })
            .map(|(name, _)| name);

        let mut buckets: BTreeMap<(String, NaiveDate), Decimal> = BTreeMap::new();
        for invoice in state
            .invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
        {
            let Some(view) = state.invoice_view(invoice) else {
                continue;
            };
            let month = month_of(invoice.revenue_date().date_naive());
            *buckets.entry((view.plan_name, month)).or_default() += invoice.total_amount;
        }

        Ok(DashboardFacts {
            total_customers: state.customers.len() as i64,
            active_subscriptions: count_subscriptions(SubscriptionStatus::Active),
            trial_subscriptions: count_subscriptions(SubscriptionStatus::Trial),
            pending_invoices: state
                .invoices
                .iter()
                .filter(|i| i.status.is_pending())
                .count() as i64,
            overdue_invoices: state
                .invoices
                .iter()
                .filter(|i| i.status == InvoiceStatus::Overdue)
                .count() as i64,
            popular_plan,
            paid_revenue: buckets
                .into_iter()
                .map(|((plan_name, month), revenue)| RevenueBucket {
                    plan_name,
                    month,
                    revenue,
                })
                .collect(),
        })
    }
}
