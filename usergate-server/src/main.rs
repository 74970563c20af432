//! usergate HTTP server binary

use std::path::PathBuf;
use tracing::info;
use usergate_core::UsergateConfig;
use usergate_server::tracing::TelemetrySettings;

/// Optional path to a TOML configuration file
const ENV_CONFIG_PATH: &str = "USERGATE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = TelemetrySettings::from_env();

    if telemetry.enabled {
        usergate_server::tracing::init_tracing_stack("usergate-server", &telemetry)?;
        info!("OpenTelemetry tracing enabled");
    } else {
        usergate_server::tracing::init_console()?;
        info!("Console logging enabled (set OTEL_ENABLED=true for OpenTelemetry)");
    }

    info!("Starting usergate HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    usergate_server::metrics::init_prometheus()?;
    usergate_server::metrics::init_metrics();

    let config_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
    let config = UsergateConfig::load(config_path.as_deref())?;

    usergate_server::serve(config).await?;

    if telemetry.enabled {
        info!("Flushing OpenTelemetry traces...");
        usergate_server::tracing::shutdown_telemetry();
    }

    info!("Server shutdown complete");
    Ok(())
}
