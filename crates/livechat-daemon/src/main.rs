//! livechat-daemon - standalone live-support chat relay.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use livechat_core::history::HistoryFormat;
use livechat_core::{RelayConfig, RelayContext};
use livechat_http::{ServerOptions, SharedState};

/// Relay chat messages between one user and one agent over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "livechat-daemon", version, about)]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "LIVECHAT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "LIVECHAT_PORT", default_value_t = 5001)]
    port: u16,

    /// Chat history file.
    #[arg(
        long,
        env = "LIVECHAT_HISTORY_FILE",
        default_value = "chat_history.json"
    )]
    history_file: PathBuf,

    /// History format: `json` (single array document) or `jsonl` (append-only lines).
    #[arg(long, env = "LIVECHAT_HISTORY_FORMAT", default_value = "json")]
    history_format: HistoryFormat,

    /// Allowed browser origin for CORS, or `*`.
    #[arg(
        long,
        env = "LIVECHAT_CORS_ORIGIN",
        default_value = "http://localhost:3000"
    )]
    cors_origin: String,

    /// Serve the client bundle from this directory.
    #[arg(long, env = "LIVECHAT_STATIC_DIR")]
    static_dir: Option<PathBuf>,
}

impl Args {
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            history_path: self.history_file.clone(),
            history_format: self.history_format,
        }
    }

    fn server_options(&self) -> ServerOptions {
        ServerOptions {
            host: self.host.clone(),
            port: self.port,
            cors_origin: self.cors_origin.clone(),
            static_dir: self.static_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    log::debug!("Starting with {:?}", args);

    let relay = RelayContext::start(args.relay_config());
    log::info!(
        "Chat history: {} ({})",
        args.history_file.display(),
        args.history_format
    );

    let state = Arc::new(SharedState::new(relay.clone()));
    let mut server = livechat_http::start(state, args.server_options()).await?;

    tokio::signal::ctrl_c().await?;
    log::info!("Received shutdown signal");

    server.stop().await;
    relay.shutdown();
    Ok(())
}
