//! cloudnotes-server: HTTP server for accounts and notes.
//!
//! Usage:
//!   cloudnotes-server [--config cloudnotes.toml] [--port 5000] [--data-dir db]
//!
//! Environment variables:
//!   PORT - Port to listen on (default: 5000)
//!   CLOUDNOTES_BIND - Address to bind (default: 0.0.0.0)
//!   CLOUDNOTES_CONFIG - Path to a TOML config file
//!   CLOUDNOTES_DATA_DIR - Directory for users.json and notes.json (default: db)
//!   CLOUDNOTES_UPLOAD_DIR - Directory for attachments (default: uploads)
//!   CLOUDNOTES_STATIC_DIR - Serve a static frontend from this directory
//!   CLOUDNOTES_ALLOWED_ORIGINS - Comma-separated CORS origins (default: any)
//!   RUST_LOG - Log filter (default: info)

use clap::Parser;
use cloudnotes::config::{ServerConfig, ServerOverrides};
use cloudnotes::server::run;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudnotes-server", about = "Note-taking HTTP server")]
struct Args {
    #[arg(long, env = "CLOUDNOTES_CONFIG", help = "TOML config file")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ServerOverrides,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => match ServerConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{:#}", e);
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };
    args.overrides.apply(&mut config);

    tracing::info!("cloudnotes-server starting on {}", config.listen_addr());

    if let Err(e) = run(config).await {
        tracing::error!("fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
