//! Event hub gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p hub-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use hub_common::{try_init_tracing_with_config, AppConfig, AppResult, TracingConfig};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.error_code(), "Gateway failed");
            eprintln!("hub-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let config = AppConfig::from_env()?;

    try_init_tracing_with_config(TracingConfig::for_environment(config.app.env))?;

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.gateway.port,
        pong_wait_ms = config.heartbeat.pong_wait.as_millis() as u64,
        "Configuration loaded"
    );

    hub_gateway::run(config).await
}
