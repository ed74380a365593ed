//! fsroute server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ dispatch::Dispatcher
//!                                          │
//!                     routing::RouteTable ◀┤ (loaded once, swapped on reload)
//!                                          │
//!                     validation gates  ◀──┤ body → params → query → headers
//!                                          │
//!                     middleware chain  ◀──┤
//!                                          ▼
//!     Client Response ◀──────────────── handler
//! ```
//!
//! Serves the route files under `demos/routes` unless `--routes-dir`
//! points elsewhere.

mod demo;

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fsroute::config::{load_config, AppConfig};
use fsroute::lifecycle::{shutdown_on_signal, Shutdown};
use fsroute::observability::logging;
use fsroute::{Dispatcher, HttpServer};

#[derive(Parser)]
#[command(name = "fsroute")]
#[command(about = "File-system routed HTTP server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the route files
    #[arg(short, long)]
    routes_dir: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// Log the route table after loading
    #[arg(long)]
    show_routes: bool,

    /// Reload routes when the directory changes
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig {
            routes: fsroute::config::RoutesConfig {
                dir: "demos/routes".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
    };
    if let Some(dir) = cli.routes_dir {
        config.routes.dir = dir;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    config.routes.show_routes |= cli.show_routes;
    config.routes.watch |= cli.watch;

    logging::init(&config.observability);

    tracing::info!("fsroute v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes_dir = %config.routes.dir,
        watch = config.routes.watch,
        "Configuration loaded"
    );

    let dispatcher = Dispatcher::from_config(&config, demo::registry())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config, dispatcher);
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
