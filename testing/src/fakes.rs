//! In-memory test doubles for the checkout capability traits.
//!
//! Every fake is cheap to clone and clones share their recordings, so a test
//! keeps one copy for assertions and hands another to the environment.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use checkout_core::error::ServiceError;
use checkout_core::services::{
    Notification, Notifier, OrderService, PaymentCallbacks, PaymentProvider, PaymentVerifier,
    ServiceFuture,
};
use checkout_core::types::{
    OrderId, OrderRequest, OrderResponse, SessionOptions, VerificationResult,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Order `order_1` for 500.00 INR.
#[must_use]
pub fn sample_order() -> OrderResponse {
    OrderResponse {
        id: OrderId::new("order_1"),
        amount: 50_000,
        currency: "INR".to_string(),
    }
}

// ============================================================================
// Order service
// ============================================================================

/// Scripted [`OrderService`].
///
/// Queued results are returned first, in order; after that every call gets
/// the fallback result.
#[derive(Clone, Debug)]
pub struct FakeOrderService {
    fallback: Result<OrderResponse, ServiceError>,
    queued: Arc<Mutex<VecDeque<Result<OrderResponse, ServiceError>>>>,
    requests: Arc<Mutex<Vec<OrderRequest>>>,
}

impl FakeOrderService {
    /// Always returns [`sample_order`]
    #[must_use]
    pub fn new() -> Self {
        Self::returning(sample_order())
    }

    /// Always returns `order`
    #[must_use]
    pub fn returning(order: OrderResponse) -> Self {
        Self {
            fallback: Ok(order),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always fails with `error`
    #[must_use]
    pub fn failing(error: ServiceError) -> Self {
        Self {
            fallback: Err(error),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a result for the next call
    #[must_use]
    pub fn then(self, result: Result<OrderResponse, ServiceError>) -> Self {
        self.queued.lock().unwrap().push_back(result);
        self
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of orders requested
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for FakeOrderService {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderService for FakeOrderService {
    fn create_order(&self, request: OrderRequest) -> ServiceFuture<OrderResponse> {
        self.requests.lock().unwrap().push(request);
        let result = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { result })
    }
}

// ============================================================================
// Payment provider
// ============================================================================

/// What [`ScriptedPaymentProvider`] does with an opened session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentScript {
    /// Report completion immediately
    Complete,
    /// Report failure for the session's own order
    Fail {
        /// Failure reason
        reason: String,
    },
    /// Report failure carrying a different order id
    FailForOrder {
        /// Failure reason
        reason: String,
        /// Order id reported by the provider
        order_id: OrderId,
    },
    /// Drop the callbacks without reporting anything
    Abandon,
    /// Keep the callbacks until the test resolves them
    Hold,
    /// Refuse to open the widget
    Unavailable,
}

/// Scripted [`PaymentProvider`] recording every session it opens.
#[derive(Clone, Debug)]
pub struct ScriptedPaymentProvider {
    script: PaymentScript,
    sessions: Arc<Mutex<Vec<SessionOptions>>>,
    held: Arc<Mutex<Vec<PaymentCallbacks>>>,
}

impl ScriptedPaymentProvider {
    /// Provider following `script` for every session
    #[must_use]
    pub fn new(script: PaymentScript) -> Self {
        Self {
            script,
            sessions: Arc::new(Mutex::new(Vec::new())),
            held: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Completes every session
    #[must_use]
    pub fn completing() -> Self {
        Self::new(PaymentScript::Complete)
    }

    /// Fails every session with `reason`
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::new(PaymentScript::Fail {
            reason: reason.into(),
        })
    }

    /// Options of every session opened so far
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionOptions> {
        self.sessions.lock().unwrap().clone()
    }

    /// Number of held sessions not yet resolved
    #[must_use]
    pub fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Complete the oldest held session. Returns `false` if none is held.
    pub fn complete_held(&self) -> bool {
        let callbacks = self.take_held();
        callbacks.map(PaymentCallbacks::completed).is_some()
    }

    /// Fail the oldest held session. Returns `false` if none is held.
    pub fn fail_held(&self, reason: &str) -> bool {
        self.take_held()
            .map(|callbacks| {
                let order_id = callbacks.order_id().clone();
                callbacks.failed(reason, order_id);
            })
            .is_some()
    }

    /// Drop the oldest held session's callbacks
    pub fn abandon_held(&self) -> bool {
        self.take_held().is_some()
    }

    fn take_held(&self) -> Option<PaymentCallbacks> {
        let mut held = self.held.lock().unwrap();
        if held.is_empty() {
            None
        } else {
            Some(held.remove(0))
        }
    }
}

impl PaymentProvider for ScriptedPaymentProvider {
    fn open_session(
        &self,
        options: SessionOptions,
        callbacks: PaymentCallbacks,
    ) -> Result<(), ServiceError> {
        if self.script == PaymentScript::Unavailable {
            return Err(ServiceError::SessionUnavailable(
                "payment widget failed to load".to_string(),
            ));
        }

        self.sessions.lock().unwrap().push(options);

        match &self.script {
            PaymentScript::Complete => callbacks.completed(),
            PaymentScript::Fail { reason } => {
                let order_id = callbacks.order_id().clone();
                callbacks.failed(reason.clone(), order_id);
            },
            PaymentScript::FailForOrder { reason, order_id } => {
                callbacks.failed(reason.clone(), order_id.clone());
            },
            PaymentScript::Abandon => drop(callbacks),
            PaymentScript::Hold => self.held.lock().unwrap().push(callbacks),
            PaymentScript::Unavailable => {},
        }

        Ok(())
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Scripted [`PaymentVerifier`].
///
/// Works like [`FakeOrderService`]: queued answers first, then the fallback.
#[derive(Clone, Debug)]
pub struct FakeVerifier {
    fallback: Result<VerificationResult, ServiceError>,
    queued: Arc<Mutex<VecDeque<Result<VerificationResult, ServiceError>>>>,
    checks: Arc<Mutex<Vec<OrderId>>>,
}

impl FakeVerifier {
    fn with_fallback(fallback: Result<VerificationResult, ServiceError>) -> Self {
        Self {
            fallback,
            queued: Arc::new(Mutex::new(VecDeque::new())),
            checks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Confirms every order
    #[must_use]
    pub fn confirming() -> Self {
        Self::with_fallback(Ok(VerificationResult::CONFIRMED))
    }

    /// Answers as the backend would with `message`
    #[must_use]
    pub fn with_message(message: Option<&str>) -> Self {
        Self::with_fallback(Ok(VerificationResult::from_message(message)))
    }

    /// Fails every check with `error`
    #[must_use]
    pub fn failing(error: ServiceError) -> Self {
        Self::with_fallback(Err(error))
    }

    /// Queue an answer for the next check
    #[must_use]
    pub fn then(self, result: Result<VerificationResult, ServiceError>) -> Self {
        self.queued.lock().unwrap().push_back(result);
        self
    }

    /// Order ids checked so far, in order
    #[must_use]
    pub fn checks(&self) -> Vec<OrderId> {
        self.checks.lock().unwrap().clone()
    }
}

impl PaymentVerifier for FakeVerifier {
    fn check_payment(&self, order_id: &OrderId) -> ServiceFuture<VerificationResult> {
        self.checks.lock().unwrap().push(order_id.clone());
        let result = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { result })
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// [`Notifier`] that keeps every notification.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification, oldest first
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Message text of every notification, oldest first
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
