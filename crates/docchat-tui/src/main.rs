//! docchat terminal client.
//!
//! Chat with uploaded documents: a document sidebar with upload, and a chat
//! pane talking to the backend over a websocket.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docchat_core::{BuildEnvironment, SessionOptions};

mod app;
mod backend;
mod config;
mod event;
mod state;
mod ui;

use app::App;
use config::{Config, DEFAULT_LOG_FILE, DEFAULT_SERVER};
use event::{BackendCommand, UiEvent};
use state::UiState;

/// Default tracing filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "docchat=debug,docchat_client=debug,docchat_core=debug";

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Chat with your documents from the terminal")]
#[command(version)]
struct Cli {
    /// Backend base URL (HTTP API and, outside production, the chat channel)
    #[arg(short, long, env = "DOCCHAT_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Production build: the chat channel goes to the hosted backend
    #[arg(long, env = "DOCCHAT_PRODUCTION")]
    production: bool,

    /// Document list refresh interval in seconds
    #[arg(short, long, default_value = "5")]
    poll_interval: u64,

    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Clear the waiting indicator when an unreadable frame arrives
    #[arg(long)]
    release_pending_on_malformed: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            server: self.server,
            environment: if self.production {
                BuildEnvironment::Production
            } else {
                BuildEnvironment::Development
            },
            poll_interval: Duration::from_secs(self.poll_interval.max(1)),
            log_file: self.log_file,
            session: SessionOptions {
                release_pending_on_malformed: self.release_pending_on_malformed,
            },
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = Cli::parse().into_config();

    // Write logs to a file to avoid terminal interference
    if let Ok(file) = std::fs::File::create(&config.log_file) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_env_filter(filter)
            .with_ansi(false)
            .init();
    }

    run(config)
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let chat_url = config.chat_url()?;
    info!(server = %config.server, chat_url = %chat_url, "Starting docchat");

    // Create channels for UI <-> backend communication
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>(100);
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>(100);

    // Spawn background thread with its own tokio runtime
    let backend_config = config.clone();
    let bg_handle = std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "Failed to create tokio runtime");
                return;
            }
        };
        rt.block_on(backend::run_backend(backend_config, chat_url, ui_tx, cmd_rx));
    });

    // Initialize terminal (enters alternate screen, enables raw mode)
    let terminal = ratatui::init();

    let mut app = App::new(UiState::new(config.session, config.server), ui_rx, cmd_tx);
    let result = app.run(terminal);

    // Restore terminal (exits alternate screen, disables raw mode)
    ratatui::restore();

    // Wait for background thread to finish
    let _ = bg_handle.join();

    info!("Shutdown complete");

    result.map_err(|e| e.into())
}
