//! Payment widget adapter and provider implementations.
//!
//! - [`PaymentWidget`]: builds session options from an order and opens a
//!   session on the configured [`PaymentProvider`]
//! - [`BridgePaymentProvider`]: hands sessions to a host UI running the real
//!   provider SDK and accepts the SDK's events back
//! - [`MockPaymentProvider`]: sandbox provider for development

use checkout_core::error::ServiceError;
use checkout_core::services::{PaymentCallbacks, PaymentProvider};
use checkout_core::types::{
    OrderId, OrderResponse, PaymentOutcome, Prefill, ProviderFailureEvent, SessionOptions, Theme,
};
use futures::channel::oneshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Widget
// ============================================================================

/// Merchant details copied into every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    /// Publishable provider key
    pub key: String,
    /// Merchant name
    pub merchant_name: String,
    /// Purchase description
    pub description: String,
    /// Merchant logo URL
    pub image: String,
    /// Accent colour
    pub theme_color: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            merchant_name: "RCS CTF 2024".to_string(),
            description: "RCS CTF 2024 Ticket".to_string(),
            image: "https://rcs.encryptedge.in/favicon.ico".to_string(),
            theme_color: "#531062".to_string(),
        }
    }
}

/// Opens payment sessions for orders.
#[derive(Clone)]
pub struct PaymentWidget {
    provider: Arc<dyn PaymentProvider>,
    settings: WidgetSettings,
}

impl PaymentWidget {
    /// Widget over `provider`
    #[must_use]
    pub fn new(provider: Arc<dyn PaymentProvider>, settings: WidgetSettings) -> Self {
        Self { provider, settings }
    }

    /// Session options for `order`
    ///
    /// Amount, currency and order id are copied from the order unchanged.
    #[must_use]
    pub fn session_options(&self, order: &OrderResponse, prefill: Prefill) -> SessionOptions {
        SessionOptions {
            key: self.settings.key.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            name: self.settings.merchant_name.clone(),
            description: self.settings.description.clone(),
            image: self.settings.image.clone(),
            order_id: order.id.clone(),
            prefill,
            theme: Theme {
                color: self.settings.theme_color.clone(),
            },
        }
    }

    /// Open a session for `order`
    ///
    /// The receiver resolves with the session's single outcome, or is
    /// cancelled if the provider drops the session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionUnavailable`] if the provider cannot
    /// show the widget.
    pub fn open(
        &self,
        order: &OrderResponse,
        prefill: Prefill,
    ) -> Result<oneshot::Receiver<PaymentOutcome>, ServiceError> {
        let options = self.session_options(order, prefill);
        let (callbacks, receiver) = PaymentCallbacks::new(order.id.clone());
        self.provider.open_session(options, callbacks)?;
        tracing::info!(order_id = %order.id, "Payment session opened");
        Ok(receiver)
    }
}

impl std::fmt::Debug for PaymentWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentWidget")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge provider
// ============================================================================

/// Errors delivering SDK events to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No open session for this order
    #[error("No open payment session for order {0}")]
    UnknownOrder(OrderId),

    /// The failure event could not be parsed
    #[error("Malformed payment failure event: {0}")]
    MalformedEvent(String),
}

/// Provider whose widget runs in a host UI.
///
/// Opened sessions are sent to the host over the channel returned by
/// [`BridgePaymentProvider::new`]. The host reports back through
/// [`deliver_completed`](Self::deliver_completed),
/// [`deliver_failure_event`](Self::deliver_failure_event) or
/// [`abandon`](Self::abandon).
#[derive(Clone, Debug)]
pub struct BridgePaymentProvider {
    sessions: Arc<Mutex<HashMap<OrderId, PaymentCallbacks>>>,
    host: mpsc::UnboundedSender<SessionOptions>,
}

impl BridgePaymentProvider {
    /// Bridge and the receiver the host reads sessions from
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionOptions>) {
        let (host, sessions_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            host,
        };
        (bridge, sessions_rx)
    }

    /// Number of sessions awaiting an outcome
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.lock().len()
    }

    /// The SDK reported completion for `order_id`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownOrder`] if no session is open for it.
    pub fn deliver_completed(&self, order_id: &OrderId) -> Result<(), BridgeError> {
        let callbacks = self.take(order_id)?;
        tracing::debug!(%order_id, "Payment completed callback delivered");
        callbacks.completed();
        Ok(())
    }

    /// The SDK emitted a `payment.failed` event
    ///
    /// The session is looked up by `error.metadata.order_id`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::MalformedEvent`] if `payload` is not a failure event
    /// - [`BridgeError::UnknownOrder`] if no session is open for its order
    pub fn deliver_failure_event(&self, payload: &str) -> Result<(), BridgeError> {
        let event: ProviderFailureEvent = serde_json::from_str(payload)
            .map_err(|e| BridgeError::MalformedEvent(e.to_string()))?;
        let order_id = event.error.metadata.order_id.clone();
        let callbacks = self.take(&order_id)?;
        tracing::debug!(%order_id, "Payment failure event delivered");
        callbacks.failed(event.reason(), order_id);
        Ok(())
    }

    /// The user closed the widget without paying
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownOrder`] if no session is open for it.
    pub fn abandon(&self, order_id: &OrderId) -> Result<(), BridgeError> {
        drop(self.take(order_id)?);
        tracing::debug!(%order_id, "Payment session abandoned by host");
        Ok(())
    }

    fn take(&self, order_id: &OrderId) -> Result<PaymentCallbacks, BridgeError> {
        self.lock().remove(order_id).ok_or_else(|| {
            tracing::warn!(%order_id, "Rejected event for unknown payment session");
            BridgeError::UnknownOrder(order_id.clone())
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, PaymentCallbacks>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PaymentProvider for BridgePaymentProvider {
    fn open_session(
        &self,
        options: SessionOptions,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ServiceError> {
        let order_id = options.order_id.clone();
        let mut sessions = self.lock();

        if sessions.contains_key(&order_id) {
            return Err(ServiceError::SessionUnavailable(format!(
                "a payment session is already open for order {order_id}"
            )));
        }

        self.host.send(options).map_err(|_| {
            ServiceError::SessionUnavailable("payment widget host is not connected".to_string())
        })?;
        sessions.insert(order_id, callbacks);
        Ok(())
    }
}

// ============================================================================
// Mock provider
// ============================================================================

/// Outcome the mock provider reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Report completion
    Succeed,
    /// Report failure with this reason
    Fail(String),
}

/// Mock payment provider (always reports the configured outcome)
///
/// Simulates the provider's sandbox: each session resolves after a short
/// delay. In production, use [`BridgePaymentProvider`].
#[derive(Clone, Debug)]
pub struct MockPaymentProvider {
    outcome: MockOutcome,
    delay: Duration,
}

impl MockPaymentProvider {
    /// Provider that completes every payment
    #[must_use]
    pub const fn succeeding() -> Self {
        Self {
            outcome: MockOutcome::Succeed,
            delay: Duration::from_millis(100),
        }
    }

    /// Provider that fails every payment with `reason`
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Fail(reason.into()),
            delay: Duration::from_millis(100),
        }
    }

    /// Override the simulated delay
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::succeeding()
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn open_session(
        &self,
        options: SessionOptions,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ServiceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ServiceError::SessionUnavailable(e.to_string()))?;

        let outcome = self.outcome.clone();
        let delay = self.delay;
        let payment_id = format!("pay_{}", uuid::Uuid::new_v4().simple());

        tracing::info!(
            order_id = %options.order_id,
            %payment_id,
            amount = options.amount,
            currency = %options.currency,
            "Mock payment session opened"
        );

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            match outcome {
                MockOutcome::Succeed => {
                    tracing::info!(%payment_id, "Mock payment completed");
                    callbacks.completed();
                },
                MockOutcome::Fail(reason) => {
                    tracing::info!(%payment_id, %reason, "Mock payment failed");
                    let order_id = callbacks.order_id().clone();
                    callbacks.failed(reason, order_id);
                },
            }
        });

        Ok(())
    }
}
