//! The checkout state machine.
//!
//! One [`CheckoutState`] covers one checkout attempt for one ticket type:
//!
//! ```text
//! Idle ─Submit─► CreatingOrder ─OrderCreated─► AwaitingPayment ─PaymentCompleted─► Verifying
//!  ▲                  │                          │        │                            │
//!  └── OrderFailed ───┘    SessionFailed/Abandoned┘   PaymentFailed          VerificationFinished
//!                                                         ▼                            ▼
//!                                                        Done (Error)          Done (Success | Error)
//! ```
//!
//! The status stays `Pending` until the session reaches `Done`. The
//! provider's completion callback never decides success on its own: only a
//! confirmed verification does.

use crate::metrics;
use crate::notifier::messages;
use crate::payment::PaymentWidget;
use crate::validation::RegistrationForm;
use crate::verification::VerificationPoller;
use checkout_core::environment::Clock;
use checkout_core::error::{CheckoutError, ServiceError};
use checkout_core::services::{Notification, Notifier, OrderService};
use checkout_core::types::{
    CheckoutStatus, OrderId, OrderRequest, OrderResponse, PaymentOutcome, RegistrationData,
    TicketType, VerificationResult,
};
use checkout_core::{DateTime, SmallVec, Utc, effect::Effect, reducer::Reducer, smallvec};
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Where the current attempt is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    /// Form shown, ready for a submission
    #[default]
    Idle,
    /// Order request in flight
    CreatingOrder,
    /// Widget open for this order
    AwaitingPayment {
        /// Order being paid
        order: OrderResponse,
    },
    /// Completion reported, backend check in flight
    Verifying {
        /// Order being verified
        order_id: OrderId,
    },
    /// Terminal status reached
    Done,
}

/// State of one checkout session.
#[derive(Clone, Debug)]
pub struct CheckoutState {
    /// Ticket being bought
    pub ticket_type: TicketType,
    /// Overall status
    pub status: CheckoutStatus,
    /// Progress of the current attempt
    pub stage: Stage,
    /// Registration of the latest accepted submission
    pub registration: Option<RegistrationData>,
    /// Every order created in this session, oldest first
    pub orders: Vec<OrderId>,
    /// Most recent error, recoverable or not
    pub last_error: Option<CheckoutError>,
    /// Accepted submissions
    pub submissions: u32,
    /// First accepted submission
    pub started_at: Option<DateTime<Utc>>,
    /// When a terminal status was reached
    pub finished_at: Option<DateTime<Utc>>,
}

impl CheckoutState {
    /// Fresh session for `ticket_type`
    #[must_use]
    pub const fn new(ticket_type: TicketType) -> Self {
        Self {
            ticket_type,
            status: CheckoutStatus::Pending,
            stage: Stage::Idle,
            registration: None,
            orders: Vec::new(),
            last_error: None,
            submissions: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Whether a submission or payment is in flight
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(
            self.stage,
            Stage::CreatingOrder | Stage::AwaitingPayment { .. } | Stage::Verifying { .. }
        )
    }

    /// Whether a new submission would be accepted
    #[must_use]
    pub const fn accepts_submission(&self) -> bool {
        matches!(self.stage, Stage::Idle) && !self.status.is_terminal()
    }

    /// Order of the in-flight payment or verification
    #[must_use]
    pub const fn active_order(&self) -> Option<&OrderId> {
        match &self.stage {
            Stage::AwaitingPayment { order } => Some(&order.id),
            Stage::Verifying { order_id } => Some(order_id),
            Stage::Idle | Stage::CreatingOrder | Stage::Done => None,
        }
    }

    fn awaits_payment_for(&self, order_id: &OrderId) -> bool {
        matches!(&self.stage, Stage::AwaitingPayment { order } if &order.id == order_id)
    }

    fn verifies(&self, order_id: &OrderId) -> bool {
        matches!(&self.stage, Stage::Verifying { order_id: current } if current == order_id)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Every input to the checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutAction {
    // Commands
    /// The user submitted the registration form
    Submit {
        /// Form as typed
        form: RegistrationForm,
    },

    // Service results
    /// The backend created an order
    OrderCreated {
        /// The new order
        order: OrderResponse,
    },
    /// Order creation failed
    OrderFailed {
        /// Why
        error: ServiceError,
    },
    /// The widget could not be opened for an order
    SessionFailed {
        /// Order the session was for
        order_id: OrderId,
        /// Why
        error: ServiceError,
    },

    // Payment widget callbacks
    /// The provider reported completion
    PaymentCompleted {
        /// Session's order
        order_id: OrderId,
    },
    /// The provider reported failure
    PaymentFailed {
        /// Session's order
        order_id: OrderId,
        /// Provider's reason
        reason: String,
        /// Order id carried by the provider's failure event
        reported_order_id: OrderId,
    },
    /// The session ended without any callback
    PaymentAbandoned {
        /// Session's order
        order_id: OrderId,
    },

    /// The backend answered the verification
    VerificationFinished {
        /// Verified order
        order_id: OrderId,
        /// Answer
        result: VerificationResult,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the checkout reducer.
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Backend order creation
    pub orders: Arc<dyn OrderService>,
    /// Payment widget
    pub widget: PaymentWidget,
    /// Backend payment verification
    pub verifier: VerificationPoller,
    /// User-facing notifications
    pub notifier: Arc<dyn Notifier>,
    /// Clock for session timestamps
    pub clock: Arc<dyn Clock>,
}

impl CheckoutEnvironment {
    /// Bundle the checkout's dependencies
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderService>,
        widget: PaymentWidget,
        verifier: VerificationPoller,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            widget,
            verifier,
            notifier,
            clock,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for [`CheckoutState`].
#[derive(Clone, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    /// Creates a new checkout reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn notify(env: &CheckoutEnvironment, notification: Notification) -> Effect<CheckoutAction> {
        let notifier = Arc::clone(&env.notifier);
        Effect::future(async move {
            notifier.notify(notification);
            None
        })
    }

    fn create_order(env: &CheckoutEnvironment, request: OrderRequest) -> Effect<CheckoutAction> {
        let orders = Arc::clone(&env.orders);
        Effect::future(async move {
            match orders.create_order(request).await {
                Ok(order) => Some(CheckoutAction::OrderCreated { order }),
                Err(error) => Some(CheckoutAction::OrderFailed { error }),
            }
        })
    }

    /// Opens the widget, then waits for its single callback.
    fn run_payment_session(
        env: &CheckoutEnvironment,
        order: OrderResponse,
        registration: &RegistrationData,
    ) -> Effect<CheckoutAction> {
        let widget = env.widget.clone();
        let notifier = Arc::clone(&env.notifier);
        let prefill = registration.prefill();

        Effect::future(async move {
            let order_id = order.id.clone();
            let receiver = match widget.open(&order, prefill) {
                Ok(receiver) => receiver,
                Err(error) => return Some(CheckoutAction::SessionFailed { order_id, error }),
            };

            notifier.notify(
                Notification::success(messages::PAYMENT_INITIATED).lasting(messages::LONG),
            );

            Some(match receiver.await {
                Ok(PaymentOutcome::Completed) => CheckoutAction::PaymentCompleted { order_id },
                Ok(PaymentOutcome::Failed {
                    reason,
                    order_id: reported_order_id,
                }) => CheckoutAction::PaymentFailed {
                    order_id,
                    reason,
                    reported_order_id,
                },
                Err(_) => CheckoutAction::PaymentAbandoned { order_id },
            })
        })
    }

    fn verify(env: &CheckoutEnvironment, order_id: OrderId) -> Effect<CheckoutAction> {
        let verifier = env.verifier.clone();
        Effect::future(async move {
            let result = verifier.verify(&order_id).await;
            Some(CheckoutAction::VerificationFinished { order_id, result })
        })
    }

    /// Moves to a terminal status and stamps the session.
    fn finish(state: &mut CheckoutState, status: CheckoutStatus, env: &CheckoutEnvironment) {
        match state.status.transition(status) {
            Ok(next) => {
                state.status = next;
                state.stage = Stage::Done;
                let now = env.clock.now();
                state.finished_at = Some(now);

                #[allow(clippy::cast_precision_loss)]
                let duration_secs = state
                    .started_at
                    .map_or(0.0, |started| (now - started).num_milliseconds() as f64 / 1000.0);
                metrics::record_session_finished(next, duration_secs);
                tracing::info!(status = %next, ticket_type = %state.ticket_type, "Checkout finished");
            },
            Err(error) => tracing::error!(%error, "Ignored invalid checkout transition"),
        }
    }

    fn ignore(
        action: &str,
        state: &CheckoutState,
        order_id: Option<&OrderId>,
    ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        tracing::warn!(
            action,
            order_id = order_id.map(tracing::field::display),
            stage = ?state.stage,
            status = %state.status,
            "Ignored action not matching the current stage"
        );
        smallvec![Effect::None]
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Submission ==========
            CheckoutAction::Submit { form } => {
                if !state.accepts_submission() {
                    tracing::warn!(
                        stage = ?state.stage,
                        status = %state.status,
                        "Rejected submission: checkout is busy or finished"
                    );
                    return smallvec![Effect::None];
                }

                let registration = match form.validate() {
                    Ok(registration) => registration,
                    Err(errors) => {
                        tracing::debug!(%errors, "Registration form rejected");
                        let message = errors
                            .first_message()
                            .unwrap_or("Please check the form")
                            .to_string();
                        state.last_error = Some(CheckoutError::Validation(errors));
                        return smallvec![Self::notify(env, Notification::error(message))];
                    },
                };

                state.stage = Stage::CreatingOrder;
                state.submissions += 1;
                state.last_error = None;
                state.started_at.get_or_insert_with(|| env.clock.now());
                state.registration = Some(registration.clone());

                tracing::info!(ticket_type = %state.ticket_type, attempt = state.submissions, "Creating order");

                let request = OrderRequest::new(state.ticket_type.clone(), registration);
                smallvec![Self::create_order(env, request)]
            },

            CheckoutAction::OrderCreated { order } => {
                if state.stage != Stage::CreatingOrder {
                    return Self::ignore("OrderCreated", state, Some(&order.id));
                }
                let Some(registration) = state.registration.as_ref() else {
                    return Self::ignore("OrderCreated", state, Some(&order.id));
                };

                metrics::record_order_created();
                let effect = Self::run_payment_session(env, order.clone(), registration);
                state.orders.push(order.id.clone());
                state.stage = Stage::AwaitingPayment { order };
                smallvec![effect]
            },

            CheckoutAction::OrderFailed { error } => {
                if state.stage != Stage::CreatingOrder {
                    return Self::ignore("OrderFailed", state, None);
                }

                tracing::warn!(%error, "Order creation failed");
                metrics::record_order_failed();
                state.stage = Stage::Idle;
                state.last_error = Some(CheckoutError::OrderCreation(error));
                smallvec![Self::notify(
                    env,
                    Notification::error(messages::SUBMISSION_FAILED)
                )]
            },

            CheckoutAction::SessionFailed { order_id, error } => {
                if !state.awaits_payment_for(&order_id) {
                    return Self::ignore("SessionFailed", state, Some(&order_id));
                }

                tracing::warn!(%order_id, %error, "Payment widget could not be opened");
                state.stage = Stage::Idle;
                state.last_error = Some(CheckoutError::OrderCreation(error));
                smallvec![Self::notify(
                    env,
                    Notification::error(messages::SUBMISSION_FAILED)
                )]
            },

            // ========== Payment callbacks ==========
            CheckoutAction::PaymentCompleted { order_id } => {
                if !state.awaits_payment_for(&order_id) {
                    return Self::ignore("PaymentCompleted", state, Some(&order_id));
                }

                tracing::info!(%order_id, "Payment reported complete, verifying");
                metrics::record_payment_completed();
                state.stage = Stage::Verifying {
                    order_id: order_id.clone(),
                };
                // The receipt message must be shown before the verification outcome.
                smallvec![Effect::chain(vec![
                    Self::notify(env, Notification::success(messages::PAYMENT_RECEIVED)),
                    Self::verify(env, order_id),
                ])]
            },

            CheckoutAction::PaymentFailed {
                order_id,
                reason,
                reported_order_id,
            } => {
                if !state.awaits_payment_for(&order_id) {
                    return Self::ignore("PaymentFailed", state, Some(&order_id));
                }

                tracing::warn!(%order_id, %reported_order_id, %reason, "Payment failed");
                metrics::record_payment_failed();
                let notification = Notification::error(messages::payment_failed(&reported_order_id))
                    .lasting(messages::LONG);
                state.last_error = Some(CheckoutError::PaymentProvider {
                    reason,
                    order_id: reported_order_id,
                });
                Self::finish(state, CheckoutStatus::Error, env);
                smallvec![Self::notify(env, notification)]
            },

            CheckoutAction::PaymentAbandoned { order_id } => {
                if !state.awaits_payment_for(&order_id) {
                    return Self::ignore("PaymentAbandoned", state, Some(&order_id));
                }

                tracing::warn!(%order_id, "Payment session ended without a callback");
                metrics::record_payment_abandoned();
                state.stage = Stage::Idle;
                smallvec![Effect::None]
            },

            // ========== Verification ==========
            CheckoutAction::VerificationFinished { order_id, result } => {
                if !state.verifies(&order_id) {
                    return Self::ignore("VerificationFinished", state, Some(&order_id));
                }

                metrics::record_verification(result.is_confirmed());
                if result.is_confirmed() {
                    Self::finish(state, CheckoutStatus::Success, env);
                    smallvec![Self::notify(
                        env,
                        Notification::success(messages::TICKET_CONFIRMED)
                    )]
                } else {
                    state.last_error = Some(CheckoutError::Verification {
                        order_id,
                        detail: "backend did not confirm the payment".to_string(),
                    });
                    Self::finish(state, CheckoutStatus::Error, env);
                    smallvec![Self::notify(
                        env,
                        Notification::error(messages::TICKET_NOT_VERIFIED)
                    )]
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::payment::WidgetSettings;
    use checkout_testing::fakes::{
        FakeOrderService, FakeVerifier, RecordingNotifier, ScriptedPaymentProvider, sample_order,
    };
    use checkout_testing::{ReducerTest, assertions, test_clock};

    fn env() -> CheckoutEnvironment {
        CheckoutEnvironment::new(
            Arc::new(FakeOrderService::new()),
            PaymentWidget::new(
                Arc::new(ScriptedPaymentProvider::completing()),
                WidgetSettings::default(),
            ),
            VerificationPoller::new(Arc::new(FakeVerifier::confirming())),
            Arc::new(RecordingNotifier::new()),
            Arc::new(test_clock()),
        )
    }

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            contact_no: "123".to_string(),
            uni_id: String::new(),
            uni_name: String::new(),
            where_you_reside: "X".to_string(),
        }
    }

    fn registration() -> RegistrationData {
        form().validate().unwrap()
    }

    fn fresh() -> CheckoutState {
        CheckoutState::new(TicketType::new("offline_pass"))
    }

    fn creating_order() -> CheckoutState {
        CheckoutState {
            stage: Stage::CreatingOrder,
            registration: Some(registration()),
            submissions: 1,
            started_at: Some(test_clock().now()),
            ..fresh()
        }
    }

    fn awaiting_payment() -> CheckoutState {
        CheckoutState {
            stage: Stage::AwaitingPayment {
                order: sample_order(),
            },
            orders: vec![OrderId::new("order_1")],
            ..creating_order()
        }
    }

    fn verifying() -> CheckoutState {
        CheckoutState {
            stage: Stage::Verifying {
                order_id: OrderId::new("order_1"),
            },
            ..awaiting_payment()
        }
    }

    #[test]
    fn valid_submission_creates_an_order() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(fresh())
            .when_action(CheckoutAction::Submit { form: form() })
            .then_state(|state| {
                assert_eq!(state.stage, Stage::CreatingOrder);
                assert_eq!(state.status, CheckoutStatus::Pending);
                assert_eq!(state.submissions, 1);
                let registration = state.registration.as_ref().unwrap();
                assert_eq!(registration.uni_id, "N/A");
                assert_eq!(registration.uni_name, "N/A");
                assert!(state.started_at.is_some());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn invalid_submission_stays_idle() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(fresh())
            .when_action(CheckoutAction::Submit {
                form: RegistrationForm {
                    email: "not-an-email".to_string(),
                    ..form()
                },
            })
            .then_state(|state| {
                assert_eq!(state.stage, Stage::Idle);
                assert_eq!(state.submissions, 0);
                assert!(matches!(
                    state.last_error,
                    Some(CheckoutError::Validation(_))
                ));
            })
            .run();
    }

    #[test]
    fn submission_while_processing_is_ignored() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(awaiting_payment())
            .when_action(CheckoutAction::Submit { form: form() })
            .then_state(|state| {
                assert!(state.is_processing());
                assert_eq!(state.submissions, 1);
                assert_eq!(state.orders.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submission_after_terminal_status_is_ignored() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState {
                status: CheckoutStatus::Error,
                stage: Stage::Done,
                ..fresh()
            })
            .when_action(CheckoutAction::Submit { form: form() })
            .then_state(|state| {
                assert_eq!(state.status, CheckoutStatus::Error);
                assert_eq!(state.stage, Stage::Done);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn order_failure_returns_to_idle() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(creating_order())
            .when_action(CheckoutAction::OrderFailed {
                error: ServiceError::Server {
                    status: 500,
                    message: "boom".to_string(),
                },
            })
            .then_state(|state| {
                assert_eq!(state.stage, Stage::Idle);
                assert_eq!(state.status, CheckoutStatus::Pending);
                assert!(state.accepts_submission());
                assert!(matches!(
                    state.last_error,
                    Some(CheckoutError::OrderCreation(_))
                ));
            })
            .run();
    }

    #[test]
    fn created_order_opens_payment_session() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(creating_order())
            .when_action(CheckoutAction::OrderCreated {
                order: sample_order(),
            })
            .then_state(|state| {
                assert_eq!(state.active_order(), Some(&OrderId::new("order_1")));
                assert_eq!(state.orders, vec![OrderId::new("order_1")]);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn completion_moves_to_verification() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(awaiting_payment())
            .when_action(CheckoutAction::PaymentCompleted {
                order_id: OrderId::new("order_1"),
            })
            .then_state(|state| {
                assert!(state.verifies(&OrderId::new("order_1")));
                assert_eq!(state.status, CheckoutStatus::Pending);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_sequential_effect(effects);
            })
            .run();
    }

    #[test]
    fn completion_for_another_order_is_ignored() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(awaiting_payment())
            .when_action(CheckoutAction::PaymentCompleted {
                order_id: OrderId::new("order_2"),
            })
            .then_state(|state| {
                assert!(state.awaits_payment_for(&OrderId::new("order_1")));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn provider_failure_is_terminal() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(awaiting_payment())
            .when_action(CheckoutAction::PaymentFailed {
                order_id: OrderId::new("order_1"),
                reason: "Card declined".to_string(),
                reported_order_id: OrderId::new("order_1"),
            })
            .then_state(|state| {
                assert_eq!(state.status, CheckoutStatus::Error);
                assert_eq!(state.stage, Stage::Done);
                assert_eq!(state.finished_at, Some(test_clock().now()));
                assert!(state.last_error.as_ref().unwrap().is_terminal());
            })
            .run();
    }

    #[test]
    fn abandoned_session_releases_the_slot() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(awaiting_payment())
            .when_action(CheckoutAction::PaymentAbandoned {
                order_id: OrderId::new("order_1"),
            })
            .then_state(|state| {
                assert_eq!(state.status, CheckoutStatus::Pending);
                assert!(state.accepts_submission());
            })
            .run();
    }

    #[test]
    fn confirmed_verification_succeeds() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(verifying())
            .when_action(CheckoutAction::VerificationFinished {
                order_id: OrderId::new("order_1"),
                result: VerificationResult::CONFIRMED,
            })
            .then_state(|state| {
                assert_eq!(state.status, CheckoutStatus::Success);
                assert!(state.last_error.is_none());
            })
            .run();
    }

    #[test]
    fn unconfirmed_verification_fails() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(verifying())
            .when_action(CheckoutAction::VerificationFinished {
                order_id: OrderId::new("order_1"),
                result: VerificationResult::NOT_CONFIRMED,
            })
            .then_state(|state| {
                assert_eq!(state.status, CheckoutStatus::Error);
                assert!(matches!(
                    state.last_error,
                    Some(CheckoutError::Verification { .. })
                ));
            })
            .run();
    }

    #[test]
    fn late_callbacks_cannot_leave_a_terminal_status() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(verifying())
            .when_action(CheckoutAction::VerificationFinished {
                order_id: OrderId::new("order_1"),
                result: VerificationResult::CONFIRMED,
            })
            .when_action(CheckoutAction::PaymentFailed {
                order_id: OrderId::new("order_1"),
                reason: "late".to_string(),
                reported_order_id: OrderId::new("order_1"),
            })
            .when_action(CheckoutAction::VerificationFinished {
                order_id: OrderId::new("order_1"),
                result: VerificationResult::NOT_CONFIRMED,
            })
            .then_state(|state| assert_eq!(state.status, CheckoutStatus::Success))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
