//! Application startup and lifecycle management.

use crate::config::{PricingConfig, StoreBackend};
use crate::handlers::{
    self, audit_logs, customers, dashboard, invoices, plans, settings, subscriptions,
};
use crate::services::{init_metrics, Database, InMemoryStore, PricingStore};
use axum::{extract::Request, middleware, routing::get, Router, ServiceExt};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: PricingConfig,
    pub store: Arc<dyn PricingStore>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: PricingConfig) -> Result<Self, AppError> {
        init_metrics();

        let store = connect_store(&config).await?;
        Self::with_store(config, store).await
    }

    /// Build the application around an existing store.
    pub async fn with_store(
        config: PricingConfig,
        store: Arc<dyn PricingStore>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            store,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, store = ?config.store, "Pricing service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the store backing the application.
    pub fn store(&self) -> Arc<dyn PricingStore> {
        self.state.store.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = router(self.state);
        // Applied outside the router so `/api/plans/` and `/api/plans` route alike.
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        tracing::info!(
            service = "pricing-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, ServiceExt::<Request>::into_make_service(app)).await
    }
}

async fn connect_store(config: &PricingConfig) -> Result<Arc<dyn PricingStore>, AppError> {
    match (config.store, &config.database) {
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        (StoreBackend::Postgres, Some(database)) => {
            let db = Database::new(
                &database.url,
                database.max_connections,
                database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;

            if database.run_migrations {
                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
            }

            Ok(Arc::new(db))
        }
        (StoreBackend::Postgres, None) => Err(AppError::ConfigError(anyhow::anyhow!(
            "Postgres store selected without database configuration"
        ))),
    }
}

/// HTTP routes for the REST API plus health and metrics.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route("/plans/active", get(plans::list_active_plans))
        .route("/plans/featured", get(plans::list_featured_plans))
        .route(
            "/plans/:id",
            get(plans::get_plan)
                .put(plans::update_plan)
                .patch(plans::update_plan)
                .delete(plans::delete_plan),
        )
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/customers/active", get(customers::list_active_customers))
        .route(
            "/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .patch(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/active",
            get(subscriptions::list_active_subscriptions),
        )
        .route(
            "/subscriptions/:id",
            get(subscriptions::get_subscription)
                .put(subscriptions::update_subscription)
                .patch(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/invoices/pending", get(invoices::list_pending_invoices))
        .route(
            "/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/settings",
            get(settings::get_settings)
                .post(settings::create_settings)
                .put(settings::update_settings)
                .patch(settings::update_settings),
        )
        .route("/audit-logs", get(audit_logs::list_audit_logs))
        .route("/audit-logs/:id", get(audit_logs::get_audit_log))
        .route("/dashboard", get(dashboard::get_dashboard));

    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
