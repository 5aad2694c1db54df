//! PostgreSQL store for pricing-service.

use crate::models::{
    AuditLog, AuditLogView, Customer, DashboardFacts, Invoice, InvoiceView, ListAuditLogsFilter,
    ListCustomersFilter, ListInvoicesFilter, ListPlansFilter, ListSubscriptionsFilter,
    NewAuditLog, NewCustomer, NewInvoice, NewPlan, NewSettings, NewSubscription, PricingPlan,
    PricingSettings, RevenueBucket, SettingsView, Subscription, SubscriptionView,
};
use crate::services::metrics::QueryTimer;
use crate::services::store::{PricingStore, Violation};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const SUBSCRIPTION_VIEW: &str = r#"
    SELECT s.*, c.name AS customer_name, p.name AS plan_name, p.base_price AS plan_base_price
    FROM subscriptions s
    JOIN customers c ON c.id = s.customer_id
    JOIN pricing_plans p ON p.id = s.plan_id
"#;

const INVOICE_VIEW: &str = r#"
    SELECT i.*, c.name AS customer_name, p.name AS plan_name
    FROM invoices i
    JOIN subscriptions s ON s.id = i.subscription_id
    JOIN customers c ON c.id = s.customer_id
    JOIN pricing_plans p ON p.id = s.plan_id
"#;

const SETTINGS_VIEW: &str = r#"
    SELECT ps.*, p.name AS trial_plan_name
    FROM pricing_settings ps
    LEFT JOIN pricing_plans p ON p.id = ps.trial_plan_id
"#;

const AUDIT_LOG_VIEW: &str = r#"
    SELECT a.*, p.name AS plan_name, c.name AS customer_name
    FROM audit_logs a
    LEFT JOIN pricing_plans p ON p.id = a.plan_id
    LEFT JOIN customers c ON c.id = a.customer_id
"#;

/// Check constraints that back request validation, keyed by constraint name.
const CHECK_CONSTRAINTS: &[(&str, &str)] = &[
    ("ck_pricing_plans_base_price", "base_price"),
    ("ck_pricing_plans_setup_fee", "setup_fee"),
    ("ck_pricing_plans_max_loan_applications", "max_loan_applications"),
    ("ck_pricing_plans_max_users", "max_users"),
    ("ck_pricing_plans_max_storage_gb", "max_storage_gb"),
    ("ck_subscriptions_custom_price", "custom_price"),
    ("ck_subscriptions_discount_percentage", "discount_percentage"),
    ("ck_subscriptions_current_loan_applications", "current_loan_applications"),
    ("ck_subscriptions_current_users", "current_users"),
    ("ck_subscriptions_current_storage_gb", "current_storage_gb"),
    ("ck_invoices_subtotal", "subtotal"),
    ("ck_invoices_tax_amount", "tax_amount"),
    ("ck_invoices_discount_amount", "discount_amount"),
    ("ck_invoices_total_amount", "total_amount"),
    ("ck_pricing_settings_tax_rate", "tax_rate"),
    ("ck_pricing_settings_trial_days", "trial_days"),
    ("ck_pricing_settings_payment_terms_days", "payment_terms_days"),
];

/// Translate a sqlx error into an [`AppError`].
///
/// Unique (23505), foreign key (23503) and check (23514) violations on named
/// constraints become field-level validation errors; anything else is a
/// database error.
fn map_db_error(operation: &str, err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        if let (Some(code), Some(constraint)) = (code.as_deref(), db_err.constraint()) {
            match code {
                "23505" | "23503" => {
                    if let Some(violation) = Violation::from_constraint(constraint) {
                        return violation.into();
                    }
                }
                "23514" => {
                    if let Some(violation) = Violation::from_constraint(constraint) {
                        return violation.into();
                    }
                    if let Some(&(_, field)) =
                        CHECK_CONSTRAINTS.iter().find(|(name, _)| *name == constraint)
                    {
                        return AppError::invalid_field(
                            field,
                            "out_of_range",
                            "Ensure this value is within the allowed range.",
                        );
                    }
                }
                _ => {}
            }
        }
    }
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, err))
}

#[derive(FromRow)]
struct DashboardCounts {
    total_customers: i64,
    active_subscriptions: i64,
    trial_subscriptions: i64,
    pending_invoices: i64,
    overdue_invoices: i64,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "pricing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn delete_by_id(
        &self,
        operation: &'static str,
        sql: &str,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = QueryTimer::start(operation);

        let result = sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(operation, e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PricingStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = QueryTimer::start("health_check");

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    // =========================================================================
    // Plan Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_plan(&self, input: &NewPlan) -> Result<PricingPlan, AppError> {
        let timer = QueryTimer::start("create_plan");

        let plan = input.clone().into_plan(Uuid::new_v4(), Utc::now());
        let plan = sqlx::query_as::<_, PricingPlan>(
            r#"
            INSERT INTO pricing_plans (id, name, description, plan_type, billing_cycle, base_price, setup_fee,
                max_loan_applications, max_users, max_storage_gb, api_access, advanced_analytics,
                priority_support, white_label, custom_integrations, is_active, is_featured, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.plan_type.as_str())
        .bind(plan.billing_cycle.as_str())
        .bind(plan.base_price)
        .bind(plan.setup_fee)
        .bind(plan.max_loan_applications)
        .bind(plan.max_users)
        .bind(plan.max_storage_gb)
        .bind(plan.api_access)
        .bind(plan.advanced_analytics)
        .bind(plan.priority_support)
        .bind(plan.white_label)
        .bind(plan.custom_integrations)
        .bind(plan.is_active)
        .bind(plan.is_featured)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create plan", e))?;

        timer.observe_duration();
        info!(plan_id = %plan.id, name = %plan.name, "Plan created");

        Ok(plan)
    }

    #[instrument(skip(self))]
    async fn get_plan(&self, id: Uuid) -> Result<Option<PricingPlan>, AppError> {
        let timer = QueryTimer::start("get_plan");

        let plan = sqlx::query_as::<_, PricingPlan>("SELECT * FROM pricing_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("get plan", e))?;

        timer.observe_duration();
        Ok(plan)
    }

    #[instrument(skip(self))]
    async fn list_plans(&self, filter: &ListPlansFilter) -> Result<Vec<PricingPlan>, AppError> {
        let timer = QueryTimer::start("list_plans");

        let plans = sqlx::query_as::<_, PricingPlan>(
            r#"
            SELECT * FROM pricing_plans
            WHERE ($1 = FALSE OR is_active) AND ($2 = FALSE OR is_featured)
            ORDER BY base_price ASC, name ASC
            "#,
        )
        .bind(filter.active_only)
        .bind(filter.featured_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list plans", e))?;

        timer.observe_duration();
        Ok(plans)
    }

    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn update_plan(&self, plan: &PricingPlan) -> Result<PricingPlan, AppError> {
        let timer = QueryTimer::start("update_plan");

        let updated = sqlx::query_as::<_, PricingPlan>(
            r#"
            UPDATE pricing_plans
            SET name = $2, description = $3, plan_type = $4, billing_cycle = $5, base_price = $6,
                setup_fee = $7, max_loan_applications = $8, max_users = $9, max_storage_gb = $10,
                api_access = $11, advanced_analytics = $12, priority_support = $13, white_label = $14,
                custom_integrations = $15, is_active = $16, is_featured = $17, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.plan_type.as_str())
        .bind(plan.billing_cycle.as_str())
        .bind(plan.base_price)
        .bind(plan.setup_fee)
        .bind(plan.max_loan_applications)
        .bind(plan.max_users)
        .bind(plan.max_storage_gb)
        .bind(plan.api_access)
        .bind(plan.advanced_analytics)
        .bind(plan.priority_support)
        .bind(plan.white_label)
        .bind(plan.custom_integrations)
        .bind(plan.is_active)
        .bind(plan.is_featured)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update plan", e))?
        .ok_or_else(|| AppError::not_found("Plan"))?;

        timer.observe_duration();
        info!(plan_id = %updated.id, "Plan updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_plan(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_by_id("delete_plan", "DELETE FROM pricing_plans WHERE id = $1", id)
            .await
    }

    // =========================================================================
    // Customer Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, AppError> {
        let timer = QueryTimer::start("create_customer");

        let customer = input.clone().into_customer(Uuid::new_v4(), Utc::now());
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, email, phone, company_name, customer_type, status,
                address_line1, address_line2, city, state, postal_code, country, billing_email, tax_id,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company_name)
        .bind(customer.customer_type.as_str())
        .bind(customer.status.as_str())
        .bind(&customer.address_line1)
        .bind(&customer.address_line2)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(&customer.country)
        .bind(&customer.billing_email)
        .bind(&customer.tax_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create customer", e))?;

        timer.observe_duration();
        info!(customer_id = %customer.id, "Customer created");

        Ok(customer)
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let timer = QueryTimer::start("get_customer");

        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("get customer", e))?;

        timer.observe_duration();
        Ok(customer)
    }

    #[instrument(skip(self))]
    async fn list_customers(
        &self,
        filter: &ListCustomersFilter,
    ) -> Result<Vec<Customer>, AppError> {
        let timer = QueryTimer::start("list_customers");

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY name ASC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list customers", e))?;

        timer.observe_duration();
        Ok(customers)
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn update_customer(&self, customer: &Customer) -> Result<Customer, AppError> {
        let timer = QueryTimer::start("update_customer");

        let updated = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = $2, email = $3, phone = $4, company_name = $5, customer_type = $6, status = $7,
                address_line1 = $8, address_line2 = $9, city = $10, state = $11, postal_code = $12,
                country = $13, billing_email = $14, tax_id = $15, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company_name)
        .bind(customer.customer_type.as_str())
        .bind(customer.status.as_str())
        .bind(&customer.address_line1)
        .bind(&customer.address_line2)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(&customer.country)
        .bind(&customer.billing_email)
        .bind(&customer.tax_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update customer", e))?
        .ok_or_else(|| AppError::not_found("Customer"))?;

        timer.observe_duration();
        info!(customer_id = %updated.id, "Customer updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_by_id("delete_customer", "DELETE FROM customers WHERE id = $1", id)
            .await
    }

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id, plan_id = %input.plan_id))]
    async fn create_subscription(
        &self,
        input: &NewSubscription,
    ) -> Result<Subscription, AppError> {
        let timer = QueryTimer::start("create_subscription");

        let subscription = input.clone().into_subscription(Uuid::new_v4(), Utc::now());
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, customer_id, plan_id, status, start_date, end_date, trial_end_date,
                custom_price, discount_percentage, current_loan_applications, current_users, current_storage_gb,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.customer_id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.trial_end_date)
        .bind(subscription.custom_price)
        .bind(subscription.discount_percentage)
        .bind(subscription.current_loan_applications)
        .bind(subscription.current_users)
        .bind(subscription.current_storage_gb)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create subscription", e))?;

        timer.observe_duration();
        info!(subscription_id = %subscription.id, status = %subscription.status, "Subscription created");

        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn get_subscription(&self, id: Uuid) -> Result<Option<SubscriptionView>, AppError> {
        let timer = QueryTimer::start("get_subscription");

        let subscription =
            sqlx::query_as::<_, SubscriptionView>(&format!("{} WHERE s.id = $1", SUBSCRIPTION_VIEW))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_error("get subscription", e))?;

        timer.observe_duration();
        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn list_subscriptions(
        &self,
        filter: &ListSubscriptionsFilter,
    ) -> Result<Vec<SubscriptionView>, AppError> {
        let timer = QueryTimer::start("list_subscriptions");

        let subscriptions = sqlx::query_as::<_, SubscriptionView>(&format!(
            r#"{}
            WHERE ($1::varchar IS NULL OR s.status = $1)
              AND ($2::uuid IS NULL OR s.customer_id = $2)
              AND ($3::uuid IS NULL OR s.plan_id = $3)
            ORDER BY s.created_at DESC
            "#,
            SUBSCRIPTION_VIEW
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.customer_id)
        .bind(filter.plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list subscriptions", e))?;

        timer.observe_duration();
        Ok(subscriptions)
    }

    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn update_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, AppError> {
        let timer = QueryTimer::start("update_subscription");

        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET customer_id = $2, plan_id = $3, status = $4, start_date = $5, end_date = $6,
                trial_end_date = $7, custom_price = $8, discount_percentage = $9,
                current_loan_applications = $10, current_users = $11, current_storage_gb = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.customer_id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.trial_end_date)
        .bind(subscription.custom_price)
        .bind(subscription.discount_percentage)
        .bind(subscription.current_loan_applications)
        .bind(subscription.current_users)
        .bind(subscription.current_storage_gb)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update subscription", e))?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

        timer.observe_duration();
        info!(subscription_id = %updated.id, status = %updated.status, "Subscription updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_subscription(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_by_id(
            "delete_subscription",
            "DELETE FROM subscriptions WHERE id = $1",
            id,
        )
        .await
    }

    // =========================================================================
    // Invoice Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(subscription_id = %input.subscription_id))]
    async fn create_invoice(&self, input: &NewInvoice) -> Result<Invoice, AppError> {
        let timer = QueryTimer::start("create_invoice");

        let invoice = input.clone().into_invoice(Uuid::new_v4(), Utc::now());
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (id, subscription_id, invoice_number, status, issue_date, due_date, paid_date,
                subtotal, tax_amount, discount_amount, total_amount, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.subscription_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.discount_amount)
        .bind(invoice.total_amount)
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create invoice", e))?;

        timer.observe_duration();
        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Invoice created"
        );

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn get_invoice(&self, id: Uuid) -> Result<Option<InvoiceView>, AppError> {
        let timer = QueryTimer::start("get_invoice");

        let invoice = sqlx::query_as::<_, InvoiceView>(&format!("{} WHERE i.id = $1", INVOICE_VIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("get invoice", e))?;

        timer.observe_duration();
        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceView>, AppError> {
        let timer = QueryTimer::start("list_invoices");

        let invoices = sqlx::query_as::<_, InvoiceView>(&format!(
            r#"{}
            WHERE (cardinality($1::text[]) = 0 OR i.status = ANY($1))
              AND ($2::uuid IS NULL OR i.subscription_id = $2)
              AND ($3::uuid IS NULL OR s.customer_id = $3)
            ORDER BY i.created_at DESC
            "#,
            INVOICE_VIEW
        ))
        .bind(filter.status_strings())
        .bind(filter.subscription_id)
        .bind(filter.customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list invoices", e))?;

        timer.observe_duration();
        Ok(invoices)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let timer = QueryTimer::start("update_invoice");

        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET subscription_id = $2, invoice_number = $3, status = $4, issue_date = $5, due_date = $6,
                paid_date = $7, subtotal = $8, tax_amount = $9, discount_amount = $10,
                total_amount = $11, notes = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.subscription_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.discount_amount)
        .bind(invoice.total_amount)
        .bind(&invoice.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update invoice", e))?
        .ok_or_else(|| AppError::not_found("Invoice"))?;

        timer.observe_duration();
        info!(invoice_id = %updated.id, status = %updated.status, "Invoice updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_invoice(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_by_id("delete_invoice", "DELETE FROM invoices WHERE id = $1", id)
            .await
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    #[instrument(skip(self))]
    async fn get_settings(&self) -> Result<Option<SettingsView>, AppError> {
        let timer = QueryTimer::start("get_settings");

        let settings = sqlx::query_as::<_, SettingsView>(SETTINGS_VIEW)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("get settings", e))?;

        timer.observe_duration();
        Ok(settings)
    }

    #[instrument(skip(self))]
    async fn ensure_settings(&self) -> Result<SettingsView, AppError> {
        let timer = QueryTimer::start("ensure_settings");

        // Concurrent callers race on the singleton key; the loser inserts nothing.
        let inserted = sqlx::query(
            "INSERT INTO pricing_settings (id) VALUES ($1) ON CONFLICT (singleton) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("insert default settings", e))?;

        if inserted.rows_affected() > 0 {
            info!("Default pricing settings created");
        }

        let settings = sqlx::query_as::<_, SettingsView>(SETTINGS_VIEW)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("get settings", e))?;

        timer.observe_duration();
        Ok(settings)
    }

    #[instrument(skip(self, input))]
    async fn create_settings(&self, input: &NewSettings) -> Result<PricingSettings, AppError> {
        let timer = QueryTimer::start("create_settings");

        let settings = input.clone().into_settings(Uuid::new_v4(), Utc::now());
        let settings = sqlx::query_as::<_, PricingSettings>(
            r#"
            INSERT INTO pricing_settings (id, default_currency, tax_rate, trial_days, trial_plan_id,
                invoice_prefix, invoice_notes, payment_terms_days, allow_custom_pricing,
                require_approval_for_custom, auto_renewal, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(settings.id)
        .bind(settings.default_currency.as_str())
        .bind(settings.tax_rate)
        .bind(settings.trial_days)
        .bind(settings.trial_plan_id)
        .bind(&settings.invoice_prefix)
        .bind(&settings.invoice_notes)
        .bind(settings.payment_terms_days)
        .bind(settings.allow_custom_pricing)
        .bind(settings.require_approval_for_custom)
        .bind(settings.auto_renewal)
        .bind(settings.created_at)
        .bind(settings.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create settings", e))?;

        timer.observe_duration();
        info!(settings_id = %settings.id, "Pricing settings created");

        Ok(settings)
    }

    #[instrument(skip(self, settings), fields(settings_id = %settings.id))]
    async fn update_settings(
        &self,
        settings: &PricingSettings,
    ) -> Result<PricingSettings, AppError> {
        let timer = QueryTimer::start("update_settings");

        let updated = sqlx::query_as::<_, PricingSettings>(
            r#"
            UPDATE pricing_settings
            SET default_currency = $2, tax_rate = $3, trial_days = $4, trial_plan_id = $5,
                invoice_prefix = $6, invoice_notes = $7, payment_terms_days = $8,
                allow_custom_pricing = $9, require_approval_for_custom = $10, auto_renewal = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(settings.id)
        .bind(settings.default_currency.as_str())
        .bind(settings.tax_rate)
        .bind(settings.trial_days)
        .bind(settings.trial_plan_id)
        .bind(&settings.invoice_prefix)
        .bind(&settings.invoice_notes)
        .bind(settings.payment_terms_days)
        .bind(settings.allow_custom_pricing)
        .bind(settings.require_approval_for_custom)
        .bind(settings.auto_renewal)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update settings", e))?
        .ok_or_else(|| AppError::not_found("Pricing settings"))?;

        timer.observe_duration();
        info!(settings_id = %updated.id, "Pricing settings updated");

        Ok(updated)
    }

    // =========================================================================
    // Audit Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(action_type = %input.action_type))]
    async fn record_audit(&self, input: &NewAuditLog) -> Result<AuditLog, AppError> {
        let timer = QueryTimer::start("record_audit");

        let log = input.clone().into_log(Uuid::new_v4(), Utc::now());
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (id, action_type, description, plan_id, customer_id, subscription_id,
                invoice_id, changes, timestamp, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(log.id)
        .bind(log.action_type.as_str())
        .bind(&log.description)
        .bind(log.plan_id)
        .bind(log.customer_id)
        .bind(log.subscription_id)
        .bind(log.invoice_id)
        .bind(&log.changes)
        .bind(log.timestamp)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("record audit log", e))?;

        timer.observe_duration();
        Ok(log)
    }

    #[instrument(skip(self))]
    async fn get_audit_log(&self, id: Uuid) -> Result<Option<AuditLogView>, AppError> {
        let timer = QueryTimer::start("get_audit_log");

        let log = sqlx::query_as::<_, AuditLogView>(&format!("{} WHERE a.id = $1", AUDIT_LOG_VIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("get audit log", e))?;

        timer.observe_duration();
        Ok(log)
    }

    #[instrument(skip(self))]
    async fn list_audit_logs(
        &self,
        filter: &ListAuditLogsFilter,
    ) -> Result<Vec<AuditLogView>, AppError> {
        let timer = QueryTimer::start("list_audit_logs");

        let logs = sqlx::query_as::<_, AuditLogView>(&format!(
            r#"{}
            WHERE ($1::varchar IS NULL OR a.action_type = $1)
            ORDER BY a.timestamp DESC
            "#,
            AUDIT_LOG_VIEW
        ))
        .bind(filter.action_type.map(|a| a.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list audit logs", e))?;

        timer.observe_duration();
        Ok(logs)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    #[instrument(skip(self))]
    async fn dashboard_facts(&self) -> Result<DashboardFacts, AppError> {
        let timer = QueryTimer::start("dashboard_facts");

        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers) AS total_customers,
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'active') AS active_subscriptions,
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'trial') AS trial_subscriptions,
                (SELECT COUNT(*) FROM invoices WHERE status IN ('draft', 'sent')) AS pending_invoices,
                (SELECT COUNT(*) FROM invoices WHERE status = 'overdue') AS overdue_invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("count dashboard totals", e))?;

        let popular_plan = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.name
            FROM subscriptions s
            JOIN pricing_plans p ON p.id = s.plan_id
            WHERE s.status IN ('active', 'trial')
            GROUP BY p.name
            ORDER BY COUNT(*) DESC, p.name ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find popular plan", e))?;

        let paid_revenue = sqlx::query_as::<_, RevenueBucket>(
            r#"
            SELECT p.name AS plan_name,
                   date_trunc('month', COALESCE(i.paid_date, i.issue_date) AT TIME ZONE 'UTC')::date AS month,
                   SUM(i.total_amount) AS revenue
            FROM invoices i
            JOIN subscriptions s ON s.id = i.subscription_id
            JOIN pricing_plans p ON p.id = s.plan_id
            WHERE i.status = 'paid'
            GROUP BY 1, 2
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("sum paid revenue", e))?;

        timer.observe_duration();

        Ok(DashboardFacts {
            total_customers: counts.total_customers,
            active_subscriptions: counts.active_subscriptions,
            trial_subscriptions: counts.trial_subscriptions,
            pending_invoices: counts.pending_invoices,
            overdue_invoices: counts.overdue_invoices,
            popular_plan,
            paid_revenue,
        })
    }
}
