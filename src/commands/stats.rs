use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::open_service;

#[derive(Args)]
pub struct StatsArgs {
    /// Year to summarize
    #[arg(long)]
    pub year: i32,
}

pub fn totals(config_path: Option<PathBuf>, args: StatsArgs) -> Result<()> {
    let service = open_service(config_path)?;
    let totals = service.totals_for_year(args.year)?;
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

pub fn breakdown(config_path: Option<PathBuf>, args: StatsArgs) -> Result<()> {
    let service = open_service(config_path)?;
    for entry in service.breakdown_for_year(args.year)? {
        println!(
            "district={:?} flood={} earthquake={} landslide={}",
            entry.district, entry.counts.flood, entry.counts.earthquake, entry.counts.landslide
        );
    }
    Ok(())
}

pub fn districts(config_path: Option<PathBuf>) -> Result<()> {
    let service = open_service(config_path)?;
    let districts = service.districts();
    for name in districts.iter() {
        println!("{name}");
    }
    Ok(())
}
