//! # Ticket Checkout
//!
//! Single-ticket checkout: a registration form is validated, the backend
//! creates an order, a third-party payment widget collects the payment and
//! the backend confirms it before the ticket counts as sold.
//!
//! # Architecture
//!
//! ```text
//! RegistrationForm ──validate──► CheckoutReducer ◄────── actions ───────┐
//!                                      │                                │
//!                                   effects                             │
//!                                      ▼                                │
//!          ┌──────────────┬────────────────────┬─────────────────┐      │
//!          │ OrderService │   PaymentWidget    │  Verification   │ ─────┘
//!          │ POST /order  │ (PaymentProvider)  │ GET /check-pay  │
//!          └──────────────┴────────────────────┴─────────────────┘
//! ```
//!
//! The provider's completion callback is advisory. A session ends in
//! `Success` only when the backend's verification answer confirms the
//! payment; every other ending is `Error`.
//!
//! # Usage
//!
//! ```ignore
//! let config = Config::from_env();
//! let (bridge, sessions) = BridgePaymentProvider::new();
//! let env = config.environment(Arc::new(bridge), Arc::new(TracingNotifier))?;
//!
//! match config.router().resolve("offline_pass") {
//!     Route::Checkout(ticket_type) => {
//!         let session = CheckoutSession::new(ticket_type, env);
//!         session.submit(form).await?;
//!     },
//!     Route::Redirect { url, .. } => redirect(url),
//! }
//! ```

#![forbid(unsafe_code)]

pub mod checkout;
pub mod config;
pub mod metrics;
pub mod notifier;
pub mod order_client;
pub mod payment;
pub mod routing;
pub mod session;
pub mod validation;
pub mod verification;

pub use checkout_runtime::{EffectHandle, StoreError};

pub use checkout::{CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState, Stage};
pub use config::Config;
pub use notifier::TracingNotifier;
pub use order_client::HttpOrderClient;
pub use payment::{
    BridgeError, BridgePaymentProvider, MockPaymentProvider, PaymentWidget, WidgetSettings,
};
pub use routing::{NavigationMode, Route, TicketRouter};
pub use session::{CheckoutSession, TerminalView};
pub use validation::RegistrationForm;
pub use verification::{HttpPaymentVerifier, VerificationPolicy, VerificationPoller};

/// Domain types, errors and capability traits
pub mod types {
    pub use checkout_core::error::{
        CheckoutError, FieldError, InvalidTransition, ServiceError, ValidationErrors,
    };
    pub use checkout_core::services::{
        Notification, NotificationLevel, Notifier, OrderService, PaymentCallbacks,
        PaymentProvider, PaymentVerifier, ServiceFuture,
    };
    pub use checkout_core::types::*;
}
