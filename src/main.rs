mod config;
mod db;
mod error;
mod helpdesk;
mod llm;
mod requests;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

use crate::config::Config;
use crate::helpdesk::Helpdesk;
use crate::llm::GeminiClient;
use crate::requests::RequestStore;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.iter().any(|a| a == "--default-config") {
        print!("{}", Config::default_config_contents());
        return;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // The key has no default; refuse to start without it.
    let api_key = match Config::gemini_api_key() {
        Ok(k) => k,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    info!(
        bind = %config.bind,
        model = %config.provider.model,
        cache_answers = config.advice.cache_answers,
        "raghu starting"
    );

    // Open database
    let db_path = config.database_file();
    let conn = match db::connect(&db_path, &config.store).await {
        Ok(c) => c,
        Err(e) => {
            error!("failed to open database: {e}");
            std::process::exit(1);
        }
    };
    let store = RequestStore::new(Arc::new(Mutex::new(conn)));

    if let Err(e) = store.health_check().await {
        error!("database health check failed: {e}");
        std::process::exit(1);
    }

    let provider = match GeminiClient::new(&config.provider, api_key) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!("failed to initialize Gemini client: {e}");
            std::process::exit(1);
        }
    };

    // Handle --check
    if args.iter().any(|a| a == "--check") {
        info!("config: OK");
        info!("  bind: {}", config.bind);
        info!("  database: {}", db_path.display());
        info!("  model: {}", config.provider.model);
        info!("GEMINI_API_KEY: set");
        info!("database: OK");
        return;
    }

    let helpdesk = Arc::new(Helpdesk::new(
        store.clone(),
        provider,
        config.advice.cache_answers,
    ));

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server_handle = {
        let bind = config.bind.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = web::serve(&bind, helpdesk, shutdown_rx).await {
                error!("server error: {e}");
                std::process::exit(1);
            }
        })
    };

    info!("raghu is running — press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl+c: {e}");
    }

    info!("shutdown signal received, stopping...");
    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    if let Err(e) = store.shutdown().await {
        error!("store shutdown: {e}");
    }
    info!("raghu stopped");
}

fn print_usage() {
    println!(
        "raghu — farming helpdesk backed by the Gemini API

USAGE:
    raghu [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/raghu/config.toml)
    --default-config    Print default config to stdout and exit
    --check             Validate config, API key and database, then exit
    -h, --help          Print this help message

ENVIRONMENT:
    GEMINI_API_KEY        Required. Google AI Studio API key.
    GEMINI_MODEL          Optional. Model name (default: gemini-2.5-flash).
    GEMINI_BASE_URL       Optional. API base URL.
    RAGHU_BIND            Optional. Listen address (default: 127.0.0.1:3000).
    RAGHU_DATABASE_PATH   Optional. SQLite file (default: $data_dir/raghu/raghu.db).
    RUST_LOG              Optional. Tracing filter (default: info).
"
    );
}
