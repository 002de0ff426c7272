//! # Checkout Testing
//!
//! Testing utilities for the ticket checkout.
//!
//! This crate provides:
//! - A fixed [`Clock`] for deterministic timestamps
//! - Scripted fakes for every capability trait ([`fakes`])
//! - proptest strategies for registration fields ([`properties`])
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use checkout_testing::fakes::{FakeOrderService, FakeVerifier, RecordingNotifier};
//!
//! #[tokio::test]
//! async fn ticket_is_confirmed() {
//!     let notifier = RecordingNotifier::new();
//!     let env = environment(FakeOrderService::new(), FakeVerifier::confirming(), notifier.clone());
//!     let session = CheckoutSession::new(TicketType::new("offline_pass"), env);
//!
//!     session.submit(form()).await?;
//!     assert_eq!(session.wait_for_terminal(timeout).await?, CheckoutStatus::Success);
//!     assert!(notifier.messages().contains(&"Ticket Confirmed!".to_string()));
//! }
//! ```

use chrono::{DateTime, Utc};
use checkout_core::environment::Clock;

pub mod fakes;

pub use reducer_test::{ReducerTest, assertions};

/// Deterministic clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use checkout_testing::mocks::FixedClock;
    /// use checkout_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Fixed clock at 2024-03-01 00:00:00 UTC
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is hardcoded.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// proptest strategies for registration fields.
pub mod properties {
    use proptest::prelude::*;

    /// Addresses with one `@` and a dotted domain
    pub fn valid_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9._]{0,11}", "[a-z]{1,10}", "[a-z]{2,4}")
            .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
    }

    /// Strings that are not email addresses
    pub fn invalid_email() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,12}",
            "[a-z]{1,6}@[a-z]{1,6}",
            "@[a-z]{1,6}\\.[a-z]{2,3}",
            "[a-z]{1,6}@@[a-z]{1,6}\\.[a-z]{2,3}",
        ]
    }

    /// Phone numbers, optionally with a leading `+`
    pub fn valid_contact_no() -> impl Strategy<Value = String> {
        "\\+?[0-9]{7,13}"
    }

    /// Non-empty free text
    pub fn non_blank_text() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z ]{0,23}"
    }

    /// Empty or whitespace-only text
    pub fn blank_text() -> impl Strategy<Value = String> {
        "[ \\t]{0,4}"
    }
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub use mocks::{FixedClock, test_clock};
