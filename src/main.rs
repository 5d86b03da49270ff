//! jobharvest - job posting, course and occupation harvester.
//!
//! Scrapes public listing pages on a recurring basis and persists the
//! normalized records as JSON snapshots and document-store collections.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if jobharvest::cli::is_verbose() {
        "jobharvest=debug"
    } else {
        "jobharvest=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    jobharvest::cli::run().await
}
