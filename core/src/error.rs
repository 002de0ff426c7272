//! Error types for the checkout flow

use crate::types::{CheckoutStatus, OrderId};
use thiserror::Error;

/// Failure talking to the backend order API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status
    #[error("Server error (status {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The backend answered but the body could not be decoded
    #[error("Response decoding failed: {0}")]
    Decode(String),

    /// The payment provider could not open a session
    #[error("Payment session could not be opened: {0}")]
    SessionUnavailable(String),
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as submitted (e.g. `email`)
    pub field: &'static str,
    /// Message shown next to the field
    pub message: String,
}

/// All field errors for one form submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} invalid field(s): {}", .0.len(), summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationErrors {
    /// Message of the first rejected field
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.0.first().map(|e| e.message.as_str())
    }

    /// Whether `field` was rejected
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

/// A status change the checkout state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid checkout transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// Status before the attempted change
    pub from: CheckoutStatus,
    /// Requested status
    pub to: CheckoutStatus,
}

/// Everything that can go wrong during one checkout.
///
/// Validation and order creation failures are recoverable: the form stays
/// open and the user may resubmit. Payment provider and verification failures
/// end the session in [`CheckoutStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Form rejected before submission
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Order could not be created
    #[error("Order creation failed: {0}")]
    OrderCreation(ServiceError),

    /// The provider reported the payment as failed
    #[error("Payment failed for order {order_id}: {reason}")]
    PaymentProvider {
        /// Provider supplied reason
        reason: String,
        /// Order the payment belonged to
        order_id: OrderId,
    },

    /// The backend did not confirm the payment
    #[error("Payment for order {order_id} was not verified: {detail}")]
    Verification {
        /// Order that failed verification
        order_id: OrderId,
        /// Backend message or transport error
        detail: String,
    },
}

impl CheckoutError {
    /// Whether the error ends the session
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentProvider { .. } | Self::Verification { .. }
        )
    }
}
