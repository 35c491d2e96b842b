//! Interactive chat command

use crate::app::OutputFormat;
use crate::output::format_answer;
use agentrag_core::{Config, RagEngine};
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

pub async fn run(config: Config, format: OutputFormat) -> Result<()> {
    let engine = RagEngine::open(config).await?;
    let status = engine.status();
    eprintln!(
        "Loaded {} documents ({} chunks). Type 'quit' to leave.",
        status.documents, status.chunks
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        // A failed question does not end the session
        match engine.answer(query).await {
            Ok(answer) => println!("{}", format_answer(&answer, format, false)?),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}
