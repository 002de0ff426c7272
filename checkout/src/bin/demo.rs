//! Ticket Checkout Demo
//!
//! Runs one checkout against the configured backend, with the sandbox payment
//! provider standing in for the real widget.
//!
//! # Usage
//!
//! ```bash
//! # Backend must be reachable at CHECKOUT_API_URL
//! cargo run --bin demo -- offline_pass registration.json
//!
//! # Simulate a declined card
//! DEMO_PAYMENT_OUTCOME=fail cargo run --bin demo -- offline_pass
//! ```
//!
//! `registration.json` holds a registration form
//! (`name`, `email`, `contact_no`, `uni_id`, `uni_name`, `where_you_reside`);
//! a sample registration is used when it is omitted.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use ticket_checkout::{
    CheckoutSession, Config, MockPaymentProvider, RegistrationForm, Route, TracingNotifier,
    metrics::register_checkout_metrics,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticket_checkout=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_checkout_metrics();

    let mut args = std::env::args().skip(1);
    let ticket_type = args.next().unwrap_or_else(|| "offline_pass".to_string());
    let form = match args.next() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading registration form from {path}"))?;
            serde_json::from_str::<RegistrationForm>(&raw)
                .with_context(|| format!("parsing registration form in {path}"))?
        },
        None => sample_form(),
    };

    let config = Config::from_env();
    tracing::info!(api_url = %config.api.url, "Configuration loaded");

    let ticket_type = match config.router().resolve(&ticket_type) {
        Route::Checkout(ticket_type) => ticket_type,
        Route::Redirect { url, mode } => {
            println!("Unknown ticket type {ticket_type}, redirecting ({mode:?}) to {url}");
            return Ok(());
        },
    };

    let provider = match std::env::var("DEMO_PAYMENT_OUTCOME").as_deref() {
        Ok("fail") => MockPaymentProvider::failing("Card declined by issuer"),
        _ => MockPaymentProvider::succeeding(),
    };

    let env = config
        .environment(Arc::new(provider), Arc::new(TracingNotifier))
        .context("building HTTP client")?;
    let session = CheckoutSession::new(ticket_type, env)
        .with_landing_url(config.routing.landing_url.clone());

    let mut handle = session.submit(form).await?;
    if let Err(error) = handle.wait_with_timeout(Duration::from_secs(120)).await {
        let snapshot = session.snapshot().await;
        println!(
            "Checkout did not finish: {error} (stage {:?}, last error {:?})",
            snapshot.stage, snapshot.last_error
        );
        return Ok(());
    }

    let snapshot = session.snapshot().await;
    if !snapshot.status.is_terminal() {
        match snapshot.last_error {
            Some(error) => println!("Submission rejected: {error}"),
            None => println!("Checkout stopped in stage {:?}", snapshot.stage),
        }
        return Ok(());
    }
    tracing::info!(status = %snapshot.status, "Checkout finished");

    if let Some(view) = session.terminal_view().await {
        println!("\n{}", view.headline);
        println!("[{}] -> {} ({:?})", view.action_label, view.destination, view.navigation);
    }

    Ok(())
}

fn sample_form() -> RegistrationForm {
    RegistrationForm {
        name: "Asha Roy".to_string(),
        email: "asha@example.com".to_string(),
        contact_no: "+91 98765 43210".to_string(),
        uni_id: String::new(),
        uni_name: String::new(),
        where_you_reside: "Kolkata".to_string(),
    }
}
