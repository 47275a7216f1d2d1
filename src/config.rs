use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    district::DistrictRegistry,
    error::{ReportError, Result},
};

pub const DEFAULT_PORT: u16 = 7171;

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".siaga"))
        .unwrap_or_else(|| PathBuf::from(".siaga"))
}

fn default_bind_addr() -> String {
    format!("127.0.0.1:{DEFAULT_PORT}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Optional toml file overriding the built-in district list.
    #[serde(default)]
    pub districts_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind_addr: default_bind_addr(),
            districts_file: None,
        }
    }
}

impl Config {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// The district reference list this deployment validates against.
    pub fn districts(&self) -> Result<DistrictRegistry> {
        match &self.districts_file {
            Some(path) => DistrictRegistry::load(path),
            None => Ok(DistrictRegistry::default()),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| ReportError::Config("unable to locate user config directory".into()))?;
    Ok(base.join("siaga").join("config.toml"))
}

/// Load the configuration, writing defaults on first run so the operator
/// has a file to edit.
pub fn load_or_default(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let config_path = if let Some(path) = path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        path
    } else {
        let path = default_config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        path
    };

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        config.ensure_data_dir()?;
        Ok((config, config_path))
    } else {
        let config = Config::default();
        config.ensure_data_dir()?;
        config.save(&config_path)?;
        Ok((config, config_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let (config, written_path) = load_or_default(Some(path.clone())).unwrap();
        assert_eq!(written_path, path);
        assert!(path.exists());
        assert_eq!(config.bind_addr, default_bind_addr());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let data_dir = dir.path().join("data");
        fs::write(
            &path,
            format!("data_dir = \"{}\"\n", data_dir.display()),
        )
        .unwrap();

        let (config, _) = load_or_default(Some(path)).unwrap();
        assert_eq!(config.data_dir, data_dir);
        assert_eq!(config.bind_addr, default_bind_addr());
        assert!(config.districts_file.is_none());
    }

    #[test]
    fn store_path_nests_under_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/siaga-test"),
            ..Config::default()
        };
        assert_eq!(config.store_path(), PathBuf::from("/tmp/siaga-test/store"));
    }
}
