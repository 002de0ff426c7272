//! One checkout attempt, driven by a [`Store`].

use crate::checkout::{CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState};
use crate::routing::{DEFAULT_LANDING_URL, NavigationMode};
use crate::validation::RegistrationForm;
use checkout_core::types::{CheckoutStatus, TicketType};
use checkout_runtime::{EffectHandle, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Store type running a checkout
pub type CheckoutStore = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

/// Panel shown once a checkout is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalView {
    /// Status the panel is for
    pub status: CheckoutStatus,
    /// Main message
    pub headline: String,
    /// Label of the single action
    pub action_label: String,
    /// Where the action leads
    pub destination: String,
    /// History behaviour of the action
    pub navigation: NavigationMode,
}

impl TerminalView {
    /// Panel for `status`, `None` while pending
    #[must_use]
    pub fn for_status(status: CheckoutStatus, landing_url: &str) -> Option<Self> {
        let (headline, navigation) = match status {
            CheckoutStatus::Pending => return None,
            CheckoutStatus::Success => (
                "Payment was successful. Please check your mail",
                NavigationMode::Push,
            ),
            CheckoutStatus::Error => (
                "Payment was unsuccessful. Please try again.",
                NavigationMode::Replace,
            ),
        };

        Some(Self {
            status,
            headline: headline.to_string(),
            action_label: "Go Back To Home Page".to_string(),
            destination: landing_url.to_string(),
            navigation,
        })
    }
}

/// A checkout session for one ticket type.
///
/// # Example
///
/// ```ignore
/// let session = CheckoutSession::new(TicketType::new("offline_pass"), env);
/// session.submit(form).await?;
///
/// let status = session.wait_for_terminal(Duration::from_secs(120)).await?;
/// if let Some(view) = session.terminal_view().await {
///     println!("{}", view.headline);
/// }
/// ```
#[derive(Clone)]
pub struct CheckoutSession {
    store: CheckoutStore,
    landing_url: String,
}

impl CheckoutSession {
    /// New session in `Pending` with nothing submitted
    #[must_use]
    pub fn new(ticket_type: TicketType, env: CheckoutEnvironment) -> Self {
        tracing::debug!(%ticket_type, "Checkout session created");
        Self {
            store: Store::new(CheckoutState::new(ticket_type), CheckoutReducer::new(), env),
            landing_url: DEFAULT_LANDING_URL.to_string(),
        }
    }

    /// Send finished sessions to `landing_url`
    #[must_use]
    pub fn with_landing_url(mut self, landing_url: impl Into<String>) -> Self {
        self.landing_url = landing_url.into();
        self
    }

    /// Submit the registration form
    ///
    /// Returns once the submission is accepted or rejected; the order and the
    /// payment continue in the background. Rejections (invalid form, busy or
    /// finished session) are visible in [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`close`](Self::close).
    pub async fn submit(&self, form: RegistrationForm) -> Result<EffectHandle, StoreError> {
        self.store.send(CheckoutAction::Submit { form }).await
    }

    /// Current status
    pub async fn status(&self) -> CheckoutStatus {
        self.store.state(|s| s.status).await
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> CheckoutState {
        self.store.state(Clone::clone).await
    }

    /// Terminal panel, `None` while pending
    pub async fn terminal_view(&self) -> Option<TerminalView> {
        TerminalView::for_status(self.status().await, &self.landing_url)
    }

    /// Wait until the session reaches `Success` or `Error`
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if the session is still pending at `timeout`
    /// - [`StoreError::ChannelClosed`] if the store went away
    pub async fn wait_for_terminal(&self, timeout: Duration) -> Result<CheckoutStatus, StoreError> {
        let mut actions = self.store.subscribe_actions();

        tokio::time::timeout(timeout, async {
            loop {
                let status = self.status().await;
                if status.is_terminal() {
                    return Ok(status);
                }
                match actions.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {},
                    Err(RecvError::Closed) => return Err(StoreError::ChannelClosed),
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Stop accepting submissions and wait for running effects
    ///
    /// Effects waiting on the payment widget only end when the provider
    /// reports back, so `timeout` bounds the wait.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running.
    pub async fn close(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("landing_url", &self.landing_url)
            .finish_non_exhaustive()
    }
}
