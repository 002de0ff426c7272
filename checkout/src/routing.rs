//! Ticket type routing.
//!
//! Only allow-listed ticket types get a checkout; anything else is sent back
//! to the landing page, replacing the current history entry.

use checkout_core::types::TicketType;
use serde::{Deserialize, Serialize};

/// Where visitors go when they leave the checkout.
pub const DEFAULT_LANDING_URL: &str = "https://rcs.encryptedge.in";

/// Ticket types sold unless configured otherwise.
pub const DEFAULT_TICKET_TYPES: &[&str] = &["offline_pass"];

/// How a navigation affects browser history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// Add a history entry
    Push,
    /// Replace the current history entry
    Replace,
}

/// Outcome of resolving a ticket type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Show the checkout for this ticket type
    Checkout(TicketType),
    /// Leave the checkout
    Redirect {
        /// Destination
        url: String,
        /// History behaviour
        mode: NavigationMode,
    },
}

/// Resolves ticket type identifiers against an allow-list.
#[derive(Debug, Clone)]
pub struct TicketRouter {
    allowed: Vec<TicketType>,
    landing_url: String,
}

impl TicketRouter {
    /// Router accepting `allowed` and redirecting everything else to `landing_url`
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = TicketType>, landing_url: impl Into<String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            landing_url: landing_url.into(),
        }
    }

    /// Whether `ticket_type` has a checkout
    #[must_use]
    pub fn is_allowed(&self, ticket_type: &str) -> bool {
        self.allowed.iter().any(|t| t.as_str() == ticket_type)
    }

    /// Landing page visitors are sent back to
    #[must_use]
    pub fn landing_url(&self) -> &str {
        &self.landing_url
    }

    /// Resolve a ticket type taken from the request path
    ///
    /// Matching is exact: identifiers are case sensitive and not trimmed.
    #[must_use]
    pub fn resolve(&self, ticket_type: &str) -> Route {
        if self.is_allowed(ticket_type) {
            Route::Checkout(TicketType::new(ticket_type))
        } else {
            tracing::debug!(ticket_type, "Unknown ticket type, redirecting to landing page");
            Route::Redirect {
                url: self.landing_url.clone(),
                mode: NavigationMode::Replace,
            }
        }
    }
}

impl Default for TicketRouter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TICKET_TYPES.iter().copied().map(TicketType::new),
            DEFAULT_LANDING_URL,
        )
    }
}
