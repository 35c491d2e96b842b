//! Config command

use agentrag_core::Config;
use anyhow::{bail, Result};
use std::path::Path;

pub fn show(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
