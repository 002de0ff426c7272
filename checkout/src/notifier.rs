//! User-facing notification texts and the default notifier.

use checkout_core::services::{Notification, NotificationLevel, Notifier};

/// Texts and durations of every notification the checkout issues.
pub mod messages {
    use checkout_core::types::OrderId;
    use std::time::Duration;

    /// Display time for messages the user must not miss
    pub const LONG: Duration = Duration::from_secs(60);

    /// Shown once the payment widget is open
    pub const PAYMENT_INITIATED: &str =
        "Payment initiated, wait for 30-60 seconds after payment! DO NOT RELOAD OR LEAVE THE PAGE";

    /// Shown when the provider reports completion
    pub const PAYMENT_RECEIVED: &str = "Payment received! Please wait";

    /// Shown when the backend confirms the ticket
    pub const TICKET_CONFIRMED: &str = "Ticket Confirmed!";

    /// Shown when verification does not confirm the ticket
    pub const TICKET_NOT_VERIFIED: &str = "Ticket not verified!";

    /// Shown when the order or the widget could not be set up
    pub const SUBMISSION_FAILED: &str = "Error Submitting Form";

    /// Shown when the provider reports a failed payment
    #[must_use]
    pub fn payment_failed(order_id: &OrderId) -> String {
        format!("Payment Failed! reach out to us with order id {order_id}")
    }
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let duration_secs = notification.duration.map(|d| d.as_secs());
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!(?duration_secs, "{}", notification.message);
            },
            NotificationLevel::Error => {
                tracing::warn!(?duration_secs, "{}", notification.message);
            },
        }
    }
}
