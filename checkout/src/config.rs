//! Configuration management for the checkout.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::checkout::CheckoutEnvironment;
use crate::order_client::HttpOrderClient;
use crate::payment::{PaymentWidget, WidgetSettings};
use crate::routing::{DEFAULT_LANDING_URL, DEFAULT_TICKET_TYPES, TicketRouter};
use crate::verification::{HttpPaymentVerifier, VerificationPolicy, VerificationPoller};
use checkout_core::environment::SystemClock;
use checkout_core::services::{Notifier, PaymentProvider};
use checkout_core::types::TicketType;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Checkout configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend order API
    pub api: ApiConfig,
    /// Payment widget options
    pub payment: PaymentConfig,
    /// Ticket routing
    pub routing: RoutingConfig,
    /// Post-payment verification
    pub verification: VerificationConfig,
}

/// Backend order API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.org`
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Payment widget configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Publishable Razorpay key id
    pub key_id: String,
    /// Merchant name shown in the widget
    pub merchant_name: String,
    /// Purchase description
    pub description: String,
    /// Merchant logo URL
    pub image_url: String,
    /// Widget accent colour
    pub theme_color: String,
}

/// Ticket routing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Ticket types that have a checkout
    pub allowed_ticket_types: Vec<String>,
    /// Where unknown ticket types and finished checkouts lead
    pub landing_url: String,
}

/// Verification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Checks per completed payment, first included
    pub max_attempts: u32,
    /// Delay before the first repeated check, in milliseconds
    pub retry_delay_ms: u64,
    /// Per-check request timeout in seconds, `None` to wait for the backend
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults of
    /// [`Config::default`].
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            api: ApiConfig {
                url: env::var("CHECKOUT_API_URL").unwrap_or(defaults.api.url),
                timeout_secs: env::var("CHECKOUT_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.api.timeout_secs),
            },
            payment: PaymentConfig {
                key_id: env::var("RAZORPAY_KEY_ID").unwrap_or(defaults.payment.key_id),
                merchant_name: env::var("CHECKOUT_MERCHANT_NAME")
                    .unwrap_or(defaults.payment.merchant_name),
                description: env::var("CHECKOUT_DESCRIPTION")
                    .unwrap_or(defaults.payment.description),
                image_url: env::var("CHECKOUT_IMAGE_URL").unwrap_or(defaults.payment.image_url),
                theme_color: env::var("CHECKOUT_THEME_COLOR")
                    .unwrap_or(defaults.payment.theme_color),
            },
            routing: RoutingConfig {
                allowed_ticket_types: env::var("CHECKOUT_ALLOWED_TICKET_TYPES")
                    .ok()
                    .map(|s| parse_list(&s))
                    .filter(|types| !types.is_empty())
                    .unwrap_or(defaults.routing.allowed_ticket_types),
                landing_url: env::var("CHECKOUT_LANDING_URL")
                    .unwrap_or(defaults.routing.landing_url),
            },
            verification: VerificationConfig {
                max_attempts: env::var("CHECKOUT_VERIFY_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.verification.max_attempts),
                retry_delay_ms: env::var("CHECKOUT_VERIFY_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.verification.retry_delay_ms),
                timeout_secs: env::var("CHECKOUT_VERIFY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .or(defaults.verification.timeout_secs),
            },
        };

        if config.payment.key_id.is_empty() {
            tracing::warn!("RAZORPAY_KEY_ID is not set; payment sessions will carry an empty key");
        }

        config
    }

    /// Router for the configured ticket types
    #[must_use]
    pub fn router(&self) -> TicketRouter {
        TicketRouter::new(
            self.routing
                .allowed_ticket_types
                .iter()
                .map(TicketType::new),
            self.routing.landing_url.clone(),
        )
    }

    /// Environment talking to the configured backend over HTTP
    ///
    /// Order creation is bounded by the API timeout. Verification uses its
    /// own client, unbounded unless a verification timeout is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn environment(
        &self,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<CheckoutEnvironment, reqwest::Error> {
        Ok(CheckoutEnvironment::new(
            Arc::new(HttpOrderClient::new(
                self.api.http_client()?,
                self.api.url.clone(),
            )),
            PaymentWidget::new(provider, self.payment.widget_settings()),
            VerificationPoller::with_policy(
                Arc::new(HttpPaymentVerifier::new(
                    self.verification.http_client()?,
                    self.api.url.clone(),
                )),
                self.verification.policy(),
            ),
            notifier,
            Arc::new(SystemClock),
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        let widget = WidgetSettings::default();
        Self {
            api: ApiConfig {
                url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
            },
            payment: PaymentConfig {
                key_id: widget.key,
                merchant_name: widget.merchant_name,
                description: widget.description,
                image_url: widget.image,
                theme_color: widget.theme_color,
            },
            routing: RoutingConfig {
                allowed_ticket_types: DEFAULT_TICKET_TYPES
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                landing_url: DEFAULT_LANDING_URL.to_string(),
            },
            verification: VerificationConfig {
                max_attempts: 1,
                retry_delay_ms: 5000,
                timeout_secs: None,
            },
        }
    }
}

impl ApiConfig {
    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP client with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout()).build()
    }
}

impl PaymentConfig {
    /// Widget settings for session options
    #[must_use]
    pub fn widget_settings(&self) -> WidgetSettings {
        WidgetSettings {
            key: self.key_id.clone(),
            merchant_name: self.merchant_name.clone(),
            description: self.description.clone(),
            image: self.image_url.clone(),
            theme_color: self.theme_color.clone(),
        }
    }
}

impl VerificationConfig {
    /// Verification policy
    #[must_use]
    pub const fn policy(&self) -> VerificationPolicy {
        VerificationPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// HTTP client for verification checks
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let builder = reqwest::Client::builder();
        match self.timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder,
        }
        .build()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
