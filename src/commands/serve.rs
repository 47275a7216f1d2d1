use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Args;

use siaga::{config::load_or_default, server, service::CoreService, store::ReportStore};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind, e.g. 127.0.0.1:7171. Overrides the configuration.
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn execute(config_path: Option<PathBuf>, args: ServeArgs) -> Result<()> {
    let (mut config, _) = load_or_default(config_path)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let store = Arc::new(ReportStore::open(config.store_path())?);
    let districts = Arc::new(config.districts()?);
    let service = Arc::new(CoreService::new(store, districts));

    server::run(&config, service).await?;
    Ok(())
}
