//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful during development when you want the REST server (with OpenAPI/Swagger UI) without
//! the workspace's `carepulse-run` wrapper.

use carepulse_core::CoreConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the CarePulse REST API server
///
/// # Environment Variables
/// - `CAREPULSE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - see [`carepulse_core::config`] for storage and catalog settings
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration cannot be resolved,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr =
        std::env::var("CAREPULSE_REST_ADDR").unwrap_or_else(|_| api_rest::DEFAULT_REST_ADDR.into());

    tracing::info!("-- Starting CarePulse REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::from_env()?);
    api_rest::serve(&addr, cfg).await
}
