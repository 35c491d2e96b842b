//! Ask command

use crate::app::{AskArgs, OutputFormat};
use crate::output::format_answer;
use agentrag_core::{Config, RagEngine};
use anyhow::Result;

pub async fn run(args: AskArgs, config: Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::open(config).await?;
    let answer = engine.answer(&args.query()).await?;
    println!("{}", format_answer(&answer, format, args.evidence)?);
    Ok(())
}
