//! Server command implementation

use std::path::Path;

use anyhow::Result;
use mentor_server::ServerConfig;

use super::open_engine;

pub async fn cmd_serve(config_path: Option<&Path>, host: &str, port: u16) -> Result<()> {
    let engine = open_engine(config_path)?;
    let server_config = ServerConfig::from_env();
    let config = engine.config();

    println!("🚀 Starting BudgetMentor prediction server...");
    println!("   Config: {}", config.source);
    println!("   Listening: http://{}:{}", host, port);
    println!(
        "   Backend: {} at {} (model: {})",
        config.backend.kind.as_str(),
        config.backend.host,
        config.backend.model
    );
    if server_config.allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", server_config.allowed_origins.join(", "));
    }
    if host != "127.0.0.1" && host != "localhost" {
        println!();
        println!("   ⚠️  No authentication - only bind to trusted networks!");
    }
    println!();

    mentor_server::serve(engine, host, port, server_config).await
}
