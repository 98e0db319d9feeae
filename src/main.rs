//! Standalone path-proxy.
//!
//! ```text
//!     Client ──▶ HttpServer ──▶ proxy_middleware ──in context──▶ upstream
//!                                      │
//!                                      └──otherwise──▶ 404 fallback
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use path_proxy::config::load_config;
use path_proxy::lifecycle::Shutdown;
use path_proxy::observability::{logging::init_logging, metrics::init_metrics};
use path_proxy::{HttpProxy, HttpServer, ProxyConfig};

#[derive(Parser, Debug)]
#[command(name = "path-proxy", version, about = "Path-scoped HTTP forwarding proxy")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = load_config(&args.config)?;
    init_logging(settings.log_level)?;

    tracing::info!(
        config = %args.config.display(),
        bind_address = %settings.listener.bind_address,
        "path-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if settings.observability.metrics_enabled {
        let addr: SocketAddr = settings.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let config = ProxyConfig::from_settings(&settings)?;
    let server = HttpServer::new(HttpProxy::new(config));

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.listen_for_signals();

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
