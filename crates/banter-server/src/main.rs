//! banter - stream chat completions to the browser over WebSockets

mod config;
mod routes;
mod state;
mod ws;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use banter_openai::{ChatClient, Session};
use banter_relay::{ChatTransport, RelayConfig};

use crate::state::AppState;

/// banter - chat with a completion API from the browser
#[derive(Parser, Debug)]
#[command(name = "banter")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (default: 127.0.0.1:8080)
    #[arg(short, long)]
    listen: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("banter=debug,tower_http=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| "banter=info".into()),
            )
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file (CLI args take precedence)
    let mut cfg = config::Config::load(args.config.as_deref());
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }

    // Check for API key (config or env)
    let Some(api_key) = cfg.resolve_api_key() else {
        eprintln!("Error: no API key found");
        eprintln!();
        eprintln!("Set your API key with: export OPENAI_API_KEY=your-key");
        eprintln!("Or add it to the config file: banter --init-config");
        std::process::exit(1);
    };

    let mut session = Session::new(api_key);
    if let Some(org) = &cfg.organization {
        session = session.with_organization(org);
    }
    let client = ChatClient::new(session)
        .with_model(cfg.model.clone())
        .with_endpoint(cfg.chat_endpoint());

    let state = AppState {
        transport: ChatTransport::new(client),
        relay: RelayConfig {
            max_tokens: cfg.max_tokens,
        },
        history_limit: cfg.history_limit,
    };

    let app = routes::router(state, &cfg.assets_dir);

    let listener = tokio::net::TcpListener::bind(&cfg.listen)
        .await
        .with_context(|| format!("binding {}", cfg.listen))?;
    info!(listen = %cfg.listen, model = %cfg.model, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
