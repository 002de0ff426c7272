//! # Checkout Core
//!
//! Core traits and domain types for the ticket checkout flow.
//!
//! The checkout is written as a reducer: a pure function that folds actions
//! into state and returns descriptions of the side effects to run next. The
//! runtime crate executes those effects and feeds their results back in.
//!
//! ## Core Concepts
//!
//! - **State**: the checkout of one registration attempt
//! - **Action**: every input to the reducer (user commands, service results,
//!   payment widget callbacks)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a side effect description, never executed by the reducer
//! - **Environment**: the order service, payment provider, verifier and
//!   notifier, injected through the capability traits in [`services`]
//!
//! ## Data Flow
//!
//! ```text
//! RegistrationForm ─► validate ─► OrderService::create_order
//!                                       │
//!                                       ▼
//!                          PaymentProvider::open_session
//!                                       │
//!                       ┌───────────────┴───────────────┐
//!                  completed()                    failed(reason, id)
//!                       │                               │
//!                       ▼                               ▼
//!            PaymentVerifier::check                   Error
//!                 │          │
//!            confirmed     anything else
//!                 ▼          ▼
//!              Success     Error
//! ```

pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the trait every state machine implements
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// Reducers are pure: they validate the action, update state in place and
    /// return the effects the runtime should execute. They never perform I/O.
    ///
    /// # Example
    ///
    /// ```
    /// use checkout_core::{effect::Effect, reducer::Reducer, SmallVec, smallvec};
    ///
    /// struct Attempts;
    ///
    /// impl Reducer for Attempts {
    ///     type State = u32;
    ///     type Action = ();
    ///     type Environment = ();
    ///
    ///     fn reduce(&self, state: &mut u32, _action: (), _env: &()) -> SmallVec<[Effect<()>; 4]> {
    ///         *state += 1;
    ///         smallvec![Effect::None]
    ///     }
    /// }
    ///
    /// let mut attempts = 0;
    /// Attempts.reduce(&mut attempts, (), &());
    /// assert_eq!(attempts, 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Most transitions emit one to three effects, so the return value is
        /// stack allocated up to four.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are values. The reducer returns them and the runtime executes
    /// them, feeding any produced action back into the reducer.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects one after another, each (and the actions it feeds
        /// back) finishing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an [`Effect::Future`]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Self::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }
}

/// Environment module - clock abstraction
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock used outside tests
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
