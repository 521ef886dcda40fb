//! Kubedesk desktop backend entry point.
//!
//! Loads the persisted settings, starts autosave and keeps the command state
//! alive until Ctrl-C.  The desktop shell registers the commands from
//! `infrastructure::ui_bridge` against the [`AppState`] built here.
//!
//! # Usage
//!
//! ```text
//! kubedesk [OPTIONS]
//!
//! Options:
//!   --config-dir <DIR>    Directory holding settings.json [env: KUBEDESK_CONFIG_DIR]
//!   --log-level <FILTER>  Log filter when RUST_LOG is unset [env: KUBEDESK_LOG] [default: info]
//! ```
//!
//! # Startup order
//!
//! ```text
//! main()
//!  └─ JsonFileRepository     -- resolves settings.json
//!  └─ AppState::initialize() -- load, merge over defaults, arm autosave
//!  └─ wait for Ctrl-C
//!  └─ AppState::shutdown()   -- write any pending change
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kubedesk_app::infrastructure::storage::settings_file::JsonFileRepository;
use kubedesk_app::infrastructure::ui_bridge::AppState;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Kubedesk desktop backend.
#[derive(Debug, Parser)]
#[command(
    name = "kubedesk",
    about = "Kubernetes desktop client backend",
    version
)]
struct Cli {
    /// Directory holding `settings.json`.
    ///
    /// Defaults to `kubedesk/` under the platform config directory.
    #[arg(long, env = "KUBEDESK_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is not set (e.g. `debug`).
    #[arg(long, default_value = "info", env = "KUBEDESK_LOG")]
    log_level: String,
}

impl Cli {
    fn repository(&self) -> anyhow::Result<JsonFileRepository> {
        match &self.config_dir {
            Some(dir) => Ok(JsonFileRepository::in_dir(dir)),
            None => JsonFileRepository::new().context("cannot locate settings directory"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.  `RUST_LOG` wins over `--log-level`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!("Kubedesk starting");

    let repository = cli.repository()?;
    info!(path = %repository.path().display(), "using settings file");

    let state = AppState::initialize(Arc::new(repository)).await;
    if let Some(load_error) = &state.load_error {
        warn!("settings not loaded ({load_error}); changes will not be saved this session");
    }

    info!("Kubedesk ready.  Press Ctrl-C to exit.");

    // In a full desktop build the web-view shell would be started here and
    // given `state` for its command handlers.  Headless, we block until
    // Ctrl-C.
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    if let Err(e) = state.shutdown().await {
        error!("final settings save failed: {e}");
    }

    info!("Kubedesk stopped");
    Ok(())
}
