use anyhow::Context;
use control_plane::{ControlPlane, ControlPlaneConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Trading Control Plane - strategy control and live state streaming

USAGE:
    control-plane [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: 0.0.0.0)
    PORT                Server port (default: 8000)
    RUST_LOG            Log level filter

EXAMPLES:
    # Run with defaults
    control-plane

    # Run with config file
    control-plane --config config.json

    # Run with custom port
    PORT=9000 control-plane
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "control_plane=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    anyhow::bail!("--config requires a path argument");
                };
                config_path = Some(path.clone());
            }
            arg => {
                print_help();
                anyhow::bail!("Unknown argument: {}", arg);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            ControlPlaneConfig::from_file(&path)
                .with_context(|| format!("loading config from {}", path))?
        }
        None => {
            tracing::info!("Using default configuration");
            ControlPlaneConfig::default()
        }
    }
    .with_env_overrides();

    tracing::info!("Strategies: {}", config.strategies.len());
    tracing::info!("Tracked symbols: {}", config.prices.len());
    tracing::info!(
        "Simulator: {} (every {} ms, volatility {})",
        if config.simulator.enabled { "enabled" } else { "disabled" },
        config.simulator.interval_ms,
        config.simulator.volatility
    );

    let control_plane = ControlPlane::new(config);

    tracing::info!("Starting Trading Control Plane");
    tracing::info!("Available endpoints:");
    tracing::info!("  GET  /api/health");
    tracing::info!("  GET  /api/dashboard");
    tracing::info!("  GET  /api/strategies");
    tracing::info!("  POST /api/strategies/{{id}}/start|stop|pause");
    tracing::info!("  GET  /api/orders?status=&strategy=&side=");
    tracing::info!("  GET|POST /api/connections, DELETE /api/connections/{{id}}");
    tracing::info!("  GET  /api/prices");
    tracing::info!("  GET  /api/logs?level=&source=&limit=");
    tracing::info!("  POST /api/command");
    tracing::info!("  GET  /api/stream (WebSocket)");

    control_plane.run().await.context("server error")
}
