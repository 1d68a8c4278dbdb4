use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tinyrest::collections::ExpiringList;
use tinyrest::config::{Config, StaticFilesConfig};
use tinyrest::routing::Router;
use tinyrest::server::Server;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tinyrest", about = "Small HTTP/1.1 REST and static file server")]
struct Cli {
    /// YAML configuration file
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory served for requests no route claims
    #[arg(short, long)]
    web_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => {
            let mut cfg = Config::load_from_file(path)?;
            cfg.apply_env();
            cfg
        }
        None => Config::load(),
    };
    if let Some(listen) = cli.listen {
        cfg.server.listen_addr = listen;
    }
    if let Some(root) = cli.web_root {
        cfg.static_files = Some(StaticFilesConfig { root });
    }

    let sessions = Arc::new(ExpiringList::new(cfg.sessions.ttl()));
    let sweeper = sessions.start_sweeper();

    let router = tinyrest::api::routes(Router::new(), sessions)?;
    let mut server = Server::new(&cfg, router)?;
    server.start().await?;

    tokio::select! {
        res = server.wait() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    server.stop().await?;
    sweeper.abort();

    Ok(())
}
