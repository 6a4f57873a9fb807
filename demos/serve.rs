//! Serves `./public` the way a production deployment would.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example serve
//!
//! Environment:
//!   PORT        listen port (default 1717)
//!   stiff.json  optional configuration file in the working directory
//!
//! Try:
//!   curl -i http://localhost:1717/
//!   curl -i -H 'accept-encoding: br, gzip' http://localhost:1717/about
//!   curl -i http://localhost:1717/about.html

use std::net::SocketAddr;
use std::{env, fs, io, process};

use stiff::{FileServer, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "stiff.json";
const PUBLIC_DIR: &str = "public";
const DEFAULT_PORT: u16 = 1717;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let port = match env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    let files = FileServer::new(&config, PUBLIC_DIR)?;
    Server::bind(SocketAddr::from(([0, 0, 0, 0], port))).serve(files).await?;
    Ok(())
}

/// A missing configuration file means the defaults; a malformed one is fatal.
fn load_config() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    match fs::read(CONFIG_FILE) {
        Ok(raw) => Ok(serde_json::from_slice(&raw)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(e.into()),
    }
}
