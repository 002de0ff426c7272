//! Capability traits for everything the checkout talks to.
//!
//! The state machine only sees these traits. Production implementations live
//! in the `ticket-checkout` crate, fakes in `checkout-testing`.

use crate::error::ServiceError;
use crate::types::{
    OrderId, OrderRequest, OrderResponse, PaymentOutcome, SessionOptions, VerificationResult,
};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by remote service calls
pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send>>;

/// Backend order creation (`POST /order`).
pub trait OrderService: Send + Sync {
    /// Create an order for one submission attempt
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Network`] or [`ServiceError::Server`] when the
    /// remote call does not succeed.
    fn create_order(&self, request: OrderRequest) -> ServiceFuture<OrderResponse>;
}

/// Backend payment confirmation (`GET /check-pay/{order_id}`).
///
/// A check must not have side effects: asking twice against the same backend
/// state returns the same answer.
pub trait PaymentVerifier: Send + Sync {
    /// Ask the backend whether the order was paid and fulfilled
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the backend cannot be reached or
    /// answers with an error.
    fn check_payment(&self, order_id: &OrderId) -> ServiceFuture<VerificationResult>;
}

/// Third-party payment widget.
///
/// Opening a session hands the provider a [`PaymentCallbacks`]; the provider
/// calls exactly one of its methods when the user finishes (or abandons) the
/// payment.
pub trait PaymentProvider: Send + Sync {
    /// Open the payment widget for an order
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionUnavailable`] when the widget cannot be
    /// shown; no callback will fire in that case.
    fn open_session(
        &self,
        options: SessionOptions,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ServiceError>;
}

/// The two callbacks of one payment session.
///
/// Both methods consume the value, so a session reports at most one outcome.
/// Dropping it without calling either leaves the session abandoned.
#[derive(Debug)]
pub struct PaymentCallbacks {
    order_id: OrderId,
    sender: oneshot::Sender<PaymentOutcome>,
}

impl PaymentCallbacks {
    /// Create the callbacks for a session and the receiver awaiting its outcome
    #[must_use]
    pub fn new(order_id: OrderId) -> (Self, oneshot::Receiver<PaymentOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { order_id, sender }, receiver)
    }

    /// Order this session pays for
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// The provider reported client-side completion
    pub fn completed(self) {
        // Receiver gone means the checkout was dropped; nothing left to notify.
        let _ = self.sender.send(PaymentOutcome::Completed);
    }

    /// The provider reported failure
    pub fn failed(self, reason: impl Into<String>, order_id: OrderId) {
        let _ = self.sender.send(PaymentOutcome::Failed {
            reason: reason.into(),
            order_id,
        });
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Positive progress
    Success,
    /// Something went wrong
    Error,
}

/// A transient message shown to the user (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Text shown to the user
    pub message: String,
    /// How long to show it, `None` for the notifier's default
    pub duration: Option<Duration>,
}

impl Notification {
    /// Success message with the default duration
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            duration: None,
        }
    }

    /// Error message with the default duration
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            duration: None,
        }
    }

    /// Override how long the message stays visible
    #[must_use]
    pub const fn lasting(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, notification: Notification);
}
