//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agentrag")]
#[command(
    author,
    version,
    about = "Ask questions about a folder of text documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "AGENTRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of documents to index
    #[arg(long, global = true, env = "AGENTRAG_DOCS")]
    pub docs: Option<PathBuf>,

    /// Index file location
    #[arg(long, global = true, env = "AGENTRAG_INDEX")]
    pub index: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build or refresh the document index
    Index(IndexArgs),

    /// Answer one question
    Ask(AskArgs),

    /// Interactive question loop
    Chat,

    /// Show index and configuration status
    Status,

    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigAction),
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct IndexArgs {
    /// Discard the existing index and re-embed everything
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Print gathered evidence along with the answer
    #[arg(long)]
    pub evidence: bool,
}

impl AskArgs {
    pub fn query(&self) -> String {
        self.query.join(" ")
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
}
