use anyhow::Context;
use asker::cli::{self, Cli, Commands};
use asker::config::AppConfig;
use asker::coordinator::QueryStatus;
use asker::relay::start_relay_server;
use clap::Parser;
use tracing::{error, info};

mod main_runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config_dir).with_context(|| {
        format!(
            "failed to load configuration from {}",
            cli.config_dir.display()
        )
    })?;

    match cli.command {
        Commands::Serve { port, downstream } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = downstream {
                config.downstream.url = url;
            }

            main_runtime::init_logging(&config.logging);

            if let Err(errors) = config.validate() {
                for e in &errors {
                    error!("config: {e}");
                }
                anyhow::bail!("invalid configuration ({} problem(s))", errors.len());
            }

            info!(
                port = config.server.port,
                downstream = %config.downstream.url,
                origins = ?config.cors.allowed_origins,
                "starting relay"
            );
            start_relay_server(&config).await?;
        }
        Commands::Ask {
            text,
            endpoint,
            json,
        } => {
            main_runtime::init_logging_simple();
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }

            let state = cli::ask(&config.client, &text, json).await?;
            if state.status() == QueryStatus::Failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
