//! Business metrics for the checkout.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `checkout_orders_total{status}` - Orders by outcome (created, failed)
//! - `checkout_payments_total{outcome}` - Widget outcomes (completed, failed, abandoned)
//! - `checkout_verifications_total{result}` - Verification answers (confirmed, not_confirmed)
//! - `checkout_sessions_total{status}` - Sessions reaching a terminal status
//!
//! ## Histograms
//! - `checkout_session_duration_seconds` - First submission to terminal status

use checkout_core::types::CheckoutStatus;
use metrics::{describe_counter, describe_histogram};

/// Register all checkout metric descriptions.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_checkout_metrics() {
    describe_counter!(
        "checkout_orders_total",
        "Total number of order creation attempts by status (created, failed)"
    );
    describe_counter!(
        "checkout_payments_total",
        "Total number of payment sessions by outcome (completed, failed, abandoned)"
    );
    describe_counter!(
        "checkout_verifications_total",
        "Total number of payment verifications by result (confirmed, not_confirmed)"
    );
    describe_counter!(
        "checkout_sessions_total",
        "Total number of checkout sessions reaching a terminal status"
    );
    describe_histogram!(
        "checkout_session_duration_seconds",
        "Time from first submission to terminal status"
    );

    tracing::info!("Checkout metrics registered");
}

/// Record a created order.
pub fn record_order_created() {
    metrics::counter!("checkout_orders_total", "status" => "created").increment(1);
}

/// Record a failed order creation.
pub fn record_order_failed() {
    metrics::counter!("checkout_orders_total", "status" => "failed").increment(1);
}

/// Record a completion callback.
pub fn record_payment_completed() {
    metrics::counter!("checkout_payments_total", "outcome" => "completed").increment(1);
}

/// Record a failure callback.
pub fn record_payment_failed() {
    metrics::counter!("checkout_payments_total", "outcome" => "failed").increment(1);
}

/// Record a session that ended without a callback.
pub fn record_payment_abandoned() {
    metrics::counter!("checkout_payments_total", "outcome" => "abandoned").increment(1);
}

/// Record a verification answer.
pub fn record_verification(confirmed: bool) {
    let result = if confirmed { "confirmed" } else { "not_confirmed" };
    metrics::counter!("checkout_verifications_total", "result" => result).increment(1);
}

/// Record a session reaching `status`.
///
/// # Arguments
///
/// * `status` - Terminal status
/// * `duration_secs` - Time since the first submission
pub fn record_session_finished(status: CheckoutStatus, duration_secs: f64) {
    metrics::counter!("checkout_sessions_total", "status" => status.as_str()).increment(1);
    metrics::histogram!("checkout_session_duration_seconds").record(duration_secs);
    tracing::debug!(%status, duration_secs, "Recorded session_finished metric");
}
