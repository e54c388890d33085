use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::coordinator::{QueryCoordinator, QueryState, RelayClient};
use crate::error::{AskerError, Result};
use crate::render::render_state;

#[derive(Parser)]
#[command(name = "asker")]
#[command(version)]
#[command(about = "Relay free-text questions to an answer service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and <ASKER_ENV>.toml
    #[arg(short, long, global = true, default_value = "config", env = "ASKER_CONFIG_DIR")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay HTTP server
    Serve {
        /// Listening port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Answer service URL (overrides downstream.url)
        #[arg(long)]
        downstream: Option<String>,
    },
    /// Ask one question through a relay and print the answer
    Ask {
        /// Question text, sent as given
        text: String,
        /// Relay endpoint (overrides client.endpoint)
        #[arg(short, long)]
        endpoint: Option<String>,
        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Submit `text` through a fresh coordinator and print the settled snapshot
pub async fn ask(config: &ClientConfig, text: &str, json: bool) -> Result<QueryState> {
    let client = RelayClient::from_config(config)?;
    let coordinator = QueryCoordinator::new(Arc::new(client));
    let mut watcher = coordinator.subscribe();

    let _ = coordinator.submit(text);
    if !json {
        eprintln!("{}", render_state(&watcher.current()));
    }

    let state = watcher
        .settled()
        .await
        .ok_or_else(|| AskerError::Internal("coordinator dropped before settling".to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state.view())?);
    } else {
        println!("{}", render_state(&state));
    }

    Ok(state)
}
