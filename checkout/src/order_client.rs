//! HTTP client for the backend order API (`POST /order`).

use checkout_core::error::ServiceError;
use checkout_core::services::{OrderService, ServiceFuture};
use checkout_core::types::{OrderRequest, OrderResponse};
use reqwest::Client;

/// Creates orders over HTTP.
#[derive(Clone, Debug)]
pub struct HttpOrderClient {
    client: Client,
    api_url: String,
}

impl HttpOrderClient {
    /// Client posting to `{api_url}/order`
    #[must_use]
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create an order
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Network`] when no response arrives
    /// - [`ServiceError::Server`] for non-success statuses
    /// - [`ServiceError::Decode`] when the body is not an order
    #[tracing::instrument(skip(self, request), fields(ticket_type = %request.ticket_type))]
    pub async fn create(&self, request: &OrderRequest) -> Result<OrderResponse, ServiceError> {
        let response = self
            .client
            .post(format!("{}/order", self.api_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Order creation rejected");
            return Err(ServiceError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        let order = response
            .json::<OrderResponse>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        tracing::info!(order_id = %order.id, amount = order.amount, currency = %order.currency, "Order created");
        Ok(order)
    }
}

impl OrderService for HttpOrderClient {
    fn create_order(&self, request: OrderRequest) -> ServiceFuture<OrderResponse> {
        let client = self.clone();
        Box::pin(async move { client.create(&request).await })
    }
}
