//! Post-payment verification.
//!
//! The payment widget's completion callback only says the client saw the
//! payment go through. [`VerificationPoller`] asks the backend whether the
//! payment was captured and the ticket mailed; that answer alone decides
//! success.

use checkout_core::error::ServiceError;
use checkout_core::services::{PaymentVerifier, ServiceFuture};
use checkout_core::types::{OrderId, VerificationResponse, VerificationResult};
use checkout_runtime::retry::{RetryPolicy, poll_until};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Asks `GET {api_url}/check-pay/{order_id}`.
#[derive(Clone, Debug)]
pub struct HttpPaymentVerifier {
    client: Client,
    api_url: String,
}

impl HttpPaymentVerifier {
    /// Verifier against `api_url`
    #[must_use]
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the backend's verification answer
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Network`] when no response arrives
    /// - [`ServiceError::Server`] for non-success statuses
    /// - [`ServiceError::Decode`] when the body is not JSON
    pub async fn fetch(&self, order_id: &OrderId) -> Result<VerificationResponse, ServiceError> {
        let response = self
            .client
            .get(format!("{}/check-pay/{}", self.api_url, order_id))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<VerificationResponse>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

impl PaymentVerifier for HttpPaymentVerifier {
    fn check_payment(&self, order_id: &OrderId) -> ServiceFuture<VerificationResult> {
        let verifier = self.clone();
        let order_id = order_id.clone();
        Box::pin(async move {
            let response = verifier.fetch(&order_id).await?;
            tracing::debug!(%order_id, message = ?response.message, "Verification response");
            Ok(VerificationResult::from(&response))
        })
    }
}

/// How often a completed payment is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Checks per payment, first included. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second check; doubles for each further check
    pub retry_delay: Duration,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl VerificationPolicy {
    /// Backoff schedule for these checks
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_attempts.saturating_sub(1) as usize)
            .initial_delay(self.retry_delay)
            .build()
    }
}

/// Produces exactly one [`VerificationResult`] per completed payment.
///
/// Transport and server errors count as not confirmed. With the default
/// policy a single check is made; if the backend has not finished
/// fulfilment yet the payment is reported as not verified.
#[derive(Clone)]
pub struct VerificationPoller {
    verifier: Arc<dyn PaymentVerifier>,
    policy: VerificationPolicy,
}

impl VerificationPoller {
    /// Poller with the default single-check policy
    #[must_use]
    pub fn new(verifier: Arc<dyn PaymentVerifier>) -> Self {
        Self::with_policy(verifier, VerificationPolicy::default())
    }

    /// Poller with a custom policy
    #[must_use]
    pub fn with_policy(verifier: Arc<dyn PaymentVerifier>, policy: VerificationPolicy) -> Self {
        Self { verifier, policy }
    }

    /// Current policy
    #[must_use]
    pub const fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Verify a completed payment
    #[tracing::instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn verify(&self, order_id: &OrderId) -> VerificationResult {
        let retry = self.policy.retry_policy();

        let result = poll_until(
            &retry,
            || {
                let verifier = Arc::clone(&self.verifier);
                let order_id = order_id.clone();
                async move { check_once(verifier.as_ref(), &order_id).await }
            },
            |result| result.is_confirmed(),
        )
        .await;

        tracing::info!(confirmed = result.is_confirmed(), "Verification finished");
        result
    }
}

impl std::fmt::Debug for VerificationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationPoller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

async fn check_once(verifier: &dyn PaymentVerifier, order_id: &OrderId) -> VerificationResult {
    match verifier.check_payment(order_id).await {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(%order_id, %error, "Verification request failed, treating as not confirmed");
            VerificationResult::NOT_CONFIRMED
        },
    }
}
