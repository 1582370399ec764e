//! ReviewWeb - URL review and content-safety analysis engine.
//!
//! A tool for scraping, screenshotting, and AI-reviewing web pages with
//! tiered provider fallbacks.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if reviewweb::cli::is_verbose() {
        "reviewweb=debug"
    } else {
        "reviewweb=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Run CLI
    reviewweb::cli::run().await
}
