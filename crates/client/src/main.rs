//! Terminal client for TaskCircuit
//!
//! Drives the core sync layer from a line-oriented prompt. Screens are
//! printed to stdout; logs go to stderr.
//!
//! ```bash
//! # Against a local API
//! cargo run --bin taskcircuit -- --api-url http://localhost:3001/api
//!
//! # Finish a Google login by replaying the browser redirect
//! cargo run --bin taskcircuit -- --callback-url "/auth/callback?token=..."
//! ```

mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tc_core::app::AppShell;
use tc_core::board::BoardSyncEngine;
use tc_core::config::ClientConfig;
use tc_core::remote::HttpRemoteClient;
use tc_core::session::{FileCredentialStore, Location, SessionStore};
use tc_core::task::TaskSyncEngine;

/// CLI arguments. Flags override `TC_API_URL` and `TC_DATA_DIR`.
#[derive(Parser, Debug)]
#[command(version, about = "Task board client")]
struct Cli {
    /// Base URL of the REST API
    #[arg(long, env = "TC_API_URL")]
    api_url: Option<String>,

    /// Directory for the persisted session
    #[arg(long, env = "TC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Location the browser was sent to after Google login
    #[arg(long)]
    callback_url: Option<String>,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(url) = &self.api_url {
            config = config.with_api_base_url(url);
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tc_client=info,tc_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config();
    tracing::info!("Using API at {}", config.api_base_url);
    tracing::info!("Using data directory: {:?}", config.data_dir);

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    let storage = FileCredentialStore::new(config.session_path());
    let session = SessionStore::new(Arc::new(storage));
    let client = Arc::new(HttpRemoteClient::new(&config.api_base_url, session.handle()));

    let boards = BoardSyncEngine::new(client.clone());
    let tasks = TaskSyncEngine::new(client.clone());
    let mut shell = AppShell::new(session, client);

    let mut location = cli
        .callback_url
        .as_deref()
        .map(Location::parse)
        .unwrap_or_else(Location::root);
    shell.boot(&mut location).await;

    repl::Repl::new(shell, boards, tasks).run().await;

    tracing::info!("Exiting");
    Ok(())
}
