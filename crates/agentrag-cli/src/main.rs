//! Agentrag CLI
//!
//! Question answering over a local folder of text documents.

use agentrag_core::{AgentRagError, Config};
use anyhow::Result;
use clap::Parser;

mod app;
mod commands;
mod output;

use app::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AgentRagError>()
            .map(AgentRagError::exit_code)
            .unwrap_or(agentrag_core::error::exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let command = match cli.command {
        Commands::Config(ConfigAction::Init { force }) => {
            return commands::config::init(&config_path, force);
        }
        command => command,
    };

    let mut config = Config::load_from(&config_path)?;
    if let Some(docs) = cli.docs {
        config.documents.dir = docs;
    }
    if let Some(index) = cli.index {
        config.index.path = index;
    }

    match command {
        Commands::Index(args) => commands::index::run(args, config, cli.format).await,
        Commands::Ask(args) => commands::ask::run(args, config, cli.format).await,
        Commands::Chat => commands::chat::run(config, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
        Commands::Config(_) => commands::config::show(&config),
    }
}
