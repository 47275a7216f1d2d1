use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use super::open_service;

#[derive(Args)]
pub struct ImportArgs {
    /// Year the exported data covers
    #[arg(long)]
    pub year: i32,

    /// Path to the CSV export
    #[arg(long)]
    pub file: PathBuf,
}

pub fn execute(config_path: Option<PathBuf>, args: ImportArgs) -> Result<()> {
    let data = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let service = open_service(config_path)?;
    let count = service.import_csv(args.year, &data)?;

    println!("year={} merged_groups={}", args.year, count);
    Ok(())
}
