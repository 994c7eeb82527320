//! remindme: reminders with scheduled alerts.
//!
//! Runs an interactive shell over an in-memory reminder list. Alerts are held
//! by an in-process timer platform and printed when they fire.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remindme_core::{ConsentPolicy, LocalPlatform, Reconciler, ReminderCollection};

mod shell;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

/// How the alert permission prompt is answered.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Consent {
    /// Already granted before start
    Granted,
    /// Already denied before start
    Denied,
    /// Prompt on first alert, user allows
    AskAllow,
    /// Prompt on first alert, user declines
    AskDeny,
}

impl From<Consent> for ConsentPolicy {
    fn from(consent: Consent) -> Self {
        match consent {
            Consent::Granted => ConsentPolicy::Granted,
            Consent::Denied => ConsentPolicy::Denied,
            Consent::AskAllow => ConsentPolicy::Ask { allow: true },
            Consent::AskDeny => ConsentPolicy::Ask { allow: false },
        }
    }
}

#[derive(Parser)]
#[command(name = "remindme")]
#[command(about = "Reminders with scheduled alerts", long_about = None)]
struct Cli {
    /// Answer to the alert permission prompt
    #[arg(long, env = "REMINDME_CONSENT", value_enum, default_value = "ask-allow")]
    consent: Consent,

    /// Start with the sample reminders.
    /// Accepts "1", "true", "yes", or "on".
    #[arg(long, env = "REMINDME_SEED_EXAMPLES", value_parser = parse_bool_env, default_value = "false")]
    seed_examples: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "remindme=info,remindme_core=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (platform, fired_rx) = LocalPlatform::new(cli.consent.into());
    let reconciler = Arc::new(Reconciler::with_platform(platform.clone()));
    let reminders = if cli.seed_examples {
        ReminderCollection::seeded(reconciler)
    } else {
        ReminderCollection::new(reconciler)
    };

    tracing::info!(consent = ?cli.consent, seeded = cli.seed_examples, "remindme starting");
    shell::run(Arc::new(reminders), platform, fired_rx).await
}
