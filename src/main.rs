// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fabstir_vision_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    storage::{spawn_sweeper, FileStore},
    vision::OnnxDetector,
};

#[derive(Parser, Debug)]
#[command(name = "fabstir-vision-node", about = "Object detection inference node")]
struct Args {
    /// Address to bind the API server on
    #[arg(long, env = "API_HOST")]
    host: Option<String>,

    /// Port to bind the API server on
    #[arg(long, env = "API_PORT")]
    port: Option<u16>,

    /// Path to the exported ONNX detection model
    #[arg(long, env = "MODEL_PATH")]
    model_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Fabstir Vision Node...\n");
    println!("📦 {}", fabstir_vision_node::version::get_version_string());
    println!();

    let args = Args::parse();
    let mut config = NodeConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(model_path) = args.model_path {
        config.detector.model_path = model_path;
    }

    println!("🧠 Loading detection model...");
    let detector = OnnxDetector::new(&config.detector)?;
    println!("✅ Detection model ready");

    let store = Arc::new(FileStore::new(&config.storage)?);
    spawn_sweeper(store.clone(), config.storage.sweep_interval);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        engine: Arc::new(detector),
        store,
        config: Arc::new(config),
    };

    start_server(state, addr).await
}
