use std::{path::PathBuf, sync::Arc};

use anyhow::Result;

use siaga::{config::load_or_default, service::CoreService, store::ReportStore};

pub mod import;
pub mod report;
pub mod serve;
pub mod stats;

/// Open the store and district registry behind one service handle, the way
/// every local command needs them.
pub(crate) fn open_service(config_path: Option<PathBuf>) -> Result<CoreService> {
    let (config, _) = load_or_default(config_path)?;
    let store = Arc::new(ReportStore::open(config.store_path())?);
    let districts = Arc::new(config.districts()?);
    Ok(CoreService::new(store, districts))
}
