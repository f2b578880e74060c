use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infrastructure::TransportFactory;
use infrastructure::config::{BridgeConfig, TransportKind};
use zebra_bridge::{BridgeCore, BridgeSettings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override printer address (Bluetooth MAC, RFCOMM device or host:port)
    #[arg(long)]
    printer: Option<String>,

    /// Override printer transport
    #[arg(long, value_parser = parse_transport)]
    transport: Option<TransportKind>,
}

fn parse_transport(value: &str) -> Result<TransportKind, String> {
    match value.to_ascii_lowercase().as_str() {
        "rfcomm" | "bluetooth" => Ok(TransportKind::Rfcomm),
        "tcp" | "network" => Ok(TransportKind::Tcp),
        other => Err(format!("unknown transport '{}' (expected rfcomm or tcp)", other)),
    }
}

impl Args {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(bind) = self.bind {
            config.http.bind_host = bind;
        }
        if let Some(printer) = self.printer {
            config.printer.address = Some(printer);
        }
        if let Some(transport) = self.transport {
            config.printer.transport = transport;
        }
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,zebra_bridge=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("🦓 Zebra Bridge Starting...");
    info!("📂 Config directory: {}", args.config_dir);

    let mut config = BridgeConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir))?;
    args.apply(&mut config);

    info!(
        transport = ?config.printer.transport,
        port = config.http.port,
        "⚙️ Configuration loaded"
    );

    let transport = TransportFactory::create(&config.printer);
    let mut core = BridgeCore::new(transport, BridgeSettings::from(&config));
    core.start_with(&config).await?;

    let shutdown = core
        .shutdown_token()
        .context("Bridge did not report a shutdown token after start")?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("🛑 Shutting down..."),
            Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
        },
        _ = shutdown.cancelled() => warn!("HTTP server stopped unexpectedly"),
    }

    core.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
