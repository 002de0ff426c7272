//! Domain types for the ticket checkout.
//!
//! Wire formats follow the backend order API (`POST /order`,
//! `GET /check-pay/{order_id}`) and the payment provider's session options.

use crate::error::InvalidTransition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value stored for optional university fields left blank.
pub const NOT_APPLICABLE: &str = "N/A";

/// The only backend message that confirms a paid and fulfilled ticket.
pub const CONFIRMATION_MESSAGE: &str = "Email sent successfully";

// ============================================================================
// Identifiers
// ============================================================================

/// Ticket type identifier taken from the checkout route (e.g. `offline_pass`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketType(String);

impl TicketType {
    /// Creates a ticket type from its identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-issued order identifier.
///
/// Opaque: it is passed unchanged into the payment session and into
/// verification, never parsed or rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps a backend order id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Registration and orders
// ============================================================================

/// Validated registration details, ready to be copied into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    /// Full name
    pub name: String,
    /// Email address (tickets are mailed here)
    pub email: String,
    /// Contact number
    pub contact_no: String,
    /// College/university id, `"N/A"` when not given
    pub uni_id: String,
    /// College/university name, `"N/A"` when not given
    pub uni_name: String,
    /// Where the attendee resides
    pub where_you_reside: String,
}

impl RegistrationData {
    /// Payment widget prefill derived from this registration
    #[must_use]
    pub fn prefill(&self) -> Prefill {
        Prefill {
            name: self.name.clone(),
            email: self.email.clone(),
            contact: self.contact_no.clone(),
        }
    }
}

/// Replaces a blank optional field with [`NOT_APPLICABLE`].
#[must_use]
pub fn or_not_applicable(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NOT_APPLICABLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Body of `POST /order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Ticket being purchased
    pub ticket_type: TicketType,
    /// Registration copied from the submitted form
    pub ticket_data: RegistrationData,
}

impl OrderRequest {
    /// Creates the request for one submission attempt
    #[must_use]
    pub const fn new(ticket_type: TicketType, ticket_data: RegistrationData) -> Self {
        Self {
            ticket_type,
            ticket_data,
        }
    }
}

/// Response of `POST /order`. Extra fields returned by the backend are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Order id correlating the order with the payment session
    pub id: OrderId,
    /// Amount in the currency's minor unit
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
}

/// Customer details shown pre-filled in the payment widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    /// Customer name
    pub name: String,
    /// Customer email
    pub email: String,
    /// Customer phone number
    pub contact: String,
}

// ============================================================================
// Payment provider wire format
// ============================================================================

/// Widget colour theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Accent colour as a CSS hex string
    pub color: String,
}

/// Options handed to the payment provider when a session is opened.
///
/// Serializes to the object the provider SDK expects. The completion handler
/// is not part of the payload; it is carried by
/// [`PaymentCallbacks`](crate::services::PaymentCallbacks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Publishable provider key
    pub key: String,
    /// Amount in minor units, copied from the order
    pub amount: u64,
    /// Currency, copied from the order
    pub currency: String,
    /// Merchant name shown in the widget
    pub name: String,
    /// Purchase description
    pub description: String,
    /// Merchant logo URL
    pub image: String,
    /// Backend order id, unchanged
    pub order_id: OrderId,
    /// Customer details
    pub prefill: Prefill,
    /// Widget theme
    pub theme: Theme,
}

/// Failure event emitted by the provider SDK.
///
/// Only `error.metadata.order_id` is guaranteed; the description and reason
/// are shown when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailureEvent {
    /// Error payload
    pub error: ProviderError,
}

/// Error payload of a [`ProviderFailureEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Machine readable reason (e.g. `payment_failed`)
    #[serde(default)]
    pub reason: Option<String>,
    /// Correlation metadata
    pub metadata: ProviderErrorMetadata,
}

/// Metadata attached to a provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorMetadata {
    /// Order the failed payment belonged to
    pub order_id: OrderId,
}

impl ProviderFailureEvent {
    /// Best available failure reason
    #[must_use]
    pub fn reason(&self) -> String {
        self.error
            .description
            .clone()
            .or_else(|| self.error.reason.clone())
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

/// Result reported by the payment widget, exactly once per session.
///
/// `Completed` is advisory: the client saw the payment go through, which is
/// not proof the backend received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    /// The provider reported client-side completion
    Completed,
    /// The provider reported failure
    Failed {
        /// Why the payment failed
        reason: String,
        /// Order the payment belonged to, as reported by the provider
        order_id: OrderId,
    },
}

// ============================================================================
// Verification
// ============================================================================

/// Response of `GET /check-pay/{order_id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    /// Fulfilment message from the backend
    #[serde(default)]
    pub message: Option<String>,
}

/// Whether the backend confirmed payment and fulfilment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult(bool);

impl VerificationResult {
    /// A confirmed verification
    pub const CONFIRMED: Self = Self(true);
    /// Anything short of confirmation
    pub const NOT_CONFIRMED: Self = Self(false);

    /// Confirmed only on an exact [`CONFIRMATION_MESSAGE`] match
    #[must_use]
    pub fn from_message(message: Option<&str>) -> Self {
        Self(message == Some(CONFIRMATION_MESSAGE))
    }

    /// Whether the backend confirmed the ticket
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        self.0
    }
}

impl From<&VerificationResponse> for VerificationResult {
    fn from(response: &VerificationResponse) -> Self {
        Self::from_message(response.message.as_deref())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Overall status of one checkout session.
///
/// `Pending` is the only non-terminal status. Use [`CheckoutStatus::transition`]
/// to move between statuses; it rejects anything but `Pending → Success` and
/// `Pending → Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutStatus {
    /// Form shown, order or payment in progress
    #[default]
    Pending,
    /// Payment verified and ticket mailed
    Success,
    /// Payment failed or could not be verified
    Error,
}

impl CheckoutStatus {
    /// Whether no further transition is defined
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Moves to `next`, rejecting transitions out of terminal statuses and
    /// back into `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for any transition other than
    /// `Pending → Success` or `Pending → Error`.
    pub const fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        match (self, next) {
            (Self::Pending, Self::Success | Self::Error) => Ok(next),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
