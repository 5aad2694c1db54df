use crate::config::PricingClientConfig;
use crate::error::ClientError;
use crate::types::{
    AuditLog, Customer, CustomerDetail, Dashboard, Invoice, Plan, PlanDetail, Settings,
    Subscription, SubscriptionDetail,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use service_core::observability::TracedRequestExt;
use uuid::Uuid;

/// Client for the pricing-service REST API.
///
/// Every call targets `{base_url}/api/{endpoint}`, carries the current trace
/// context and is attempted exactly once.
#[derive(Debug, Clone)]
pub struct PricingClient {
    client: Client,
    config: PricingClientConfig,
}

impl PricingClient {
    pub fn new(config: PricingClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(PricingClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).with_trace_context();
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send the request and return the raw response, mapping non-2xx
    /// statuses to [`ClientError::Status`].
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.url(endpoint);
        let mut builder = self.request(method.clone(), &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", method, url, e);
            ClientError::Transport {
                url: url.clone(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, url = %url, "Failed to read error response body");
                    String::new()
                }
            };
            tracing::warn!(
                status = %status,
                url = %url,
                "Pricing service rejected request"
            );
            return Err(ClientError::Status { status, body });
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ClientError> {
        let response = self.execute(method, endpoint, body).await?;
        let url = response.url().to_string();
        response
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.fetch(Method::GET, endpoint, None).await
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        self.fetch(Method::POST, endpoint, Some(&body)).await
    }

    async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_body(body)?;
        self.fetch(Method::PUT, endpoint, Some(&body)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<(), ClientError> {
        self.execute(Method::DELETE, endpoint, None).await?;
        Ok(())
    }

    // Plans

    pub async fn get_plans(&self) -> Result<Vec<Plan>, ClientError> {
        self.get("plans/").await
    }

    pub async fn get_active_plans(&self) -> Result<Vec<Plan>, ClientError> {
        self.get("plans/active/").await
    }

    pub async fn get_featured_plans(&self) -> Result<Vec<Plan>, ClientError> {
        self.get("plans/featured/").await
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<PlanDetail, ClientError> {
        self.get(&format!("plans/{}/", id)).await
    }

    pub async fn create_plan<B: Serialize + ?Sized>(&self, plan: &B) -> Result<Plan, ClientError> {
        self.post("plans/", plan).await
    }

    pub async fn update_plan<B: Serialize + ?Sized>(
        &self,
        id: Uuid,
        changes: &B,
    ) -> Result<Plan, ClientError> {
        self.put(&format!("plans/{}/", id), changes).await
    }

    pub async fn delete_plan(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("plans/{}/", id)).await
    }

    // Customers

    pub async fn get_customers(&self) -> Result<Vec<Customer>, ClientError> {
        self.get("customers/").await
    }

    pub async fn get_active_customers(&self) -> Result<Vec<Customer>, ClientError> {
        self.get("customers/active/").await
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerDetail, ClientError> {
        self.get(&format!("customers/{}/", id)).await
    }

    pub async fn create_customer<B: Serialize + ?Sized>(
        &self,
        customer: &B,
    ) -> Result<Customer, ClientError> {
        self.post("customers/", customer).await
    }

    pub async fn update_customer<B: Serialize + ?Sized>(
        &self,
        id: Uuid,
        changes: &B,
    ) -> Result<Customer, ClientError> {
        self.put(&format!("customers/{}/", id), changes).await
    }

    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("customers/{}/", id)).await
    }

    // Subscriptions

    pub async fn get_subscriptions(&self) -> Result<Vec<Subscription>, ClientError> {
        self.get("subscriptions/").await
    }

    pub async fn get_active_subscriptions(&self) -> Result<Vec<Subscription>, ClientError> {
        self.get("subscriptions/active/").await
    }

    pub async fn get_subscription(&self, id: Uuid) -> Result<SubscriptionDetail, ClientError> {
        self.get(&format!("subscriptions/{}/", id)).await
    }

    pub async fn create_subscription<B: Serialize + ?Sized>(
        &self,
        subscription: &B,
    ) -> Result<Subscription, ClientError> {
        self.post("subscriptions/", subscription).await
    }

    pub async fn update_subscription<B: Serialize + ?Sized>(
        &self,
        id: Uuid,
        changes: &B,
    ) -> Result<Subscription, ClientError> {
        self.put(&format!("subscriptions/{}/", id), changes).await
    }

    pub async fn cancel_subscription(&self, id: Uuid) -> Result<Subscription, ClientError> {
        self.update_subscription(id, &json!({ "status": "cancelled" }))
            .await
    }

    // Invoices

    pub async fn get_invoices(&self) -> Result<Vec<Invoice>, ClientError> {
        self.get("invoices/").await
    }

    pub async fn get_pending_invoices(&self) -> Result<Vec<Invoice>, ClientError> {
        self.get("invoices/pending/").await
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<Invoice, ClientError> {
        self.get(&format!("invoices/{}/", id)).await
    }

    pub async fn create_invoice<B: Serialize + ?Sized>(
        &self,
        invoice: &B,
    ) -> Result<Invoice, ClientError> {
        self.post("invoices/", invoice).await
    }

    pub async fn mark_invoice_paid(&self, id: Uuid) -> Result<Invoice, ClientError> {
        self.put(&format!("invoices/{}/", id), &json!({ "status": "paid" }))
            .await
    }

    // Dashboard, settings and audit trail

    pub async fn get_dashboard(&self) -> Result<Dashboard, ClientError> {
        self.get("dashboard/").await
    }

    pub async fn get_settings(&self) -> Result<Settings, ClientError> {
        self.get("settings/").await
    }

    pub async fn update_settings<B: Serialize + ?Sized>(
        &self,
        changes: &B,
    ) -> Result<Settings, ClientError> {
        self.put("settings/", changes).await
    }

    pub async fn get_audit_logs(&self) -> Result<Vec<AuditLog>, ClientError> {
        self.get("audit-logs/").await
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::Config(format!("Failed to serialize request body: {}", e)))
}
