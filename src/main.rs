//! `carepulse-run`: the CarePulse registration service.
//!
//! Loads `.env`, initialises logging, resolves configuration once, and serves the REST API.

use carepulse_core::CoreConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the CarePulse application
///
/// # Environment Variables
/// - `CAREPULSE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PATIENT_DATA_DIR`: Directory for user and patient storage (default: "patient_data")
/// - `CAREPULSE_CATALOG`: Optional YAML catalog of doctors and identification types
/// - `CAREPULSE_COMMIT_NAME` / `CAREPULSE_COMMIT_EMAIL`: Identity on record commits
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carepulse_run=info".parse()?)
                .add_directive("carepulse_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("CAREPULSE_REST_ADDR").unwrap_or_else(|_| api_rest::DEFAULT_REST_ADDR.into());

    let cfg = Arc::new(CoreConfig::from_env()?);

    tracing::info!("++ Starting CarePulse REST on {}", rest_addr);
    api_rest::serve(&rest_addr, cfg).await
}
