use std::{collections::BTreeSet, fs, path::Path};

use serde::Deserialize;

use crate::error::{ReportError, Result};

/// Canonical district names carry this fixed prefix everywhere in the
/// system: report rows, ledger rows, and imported data all agree on it.
pub const DISTRICT_PREFIX: &str = "Kecamatan ";

/// Kecamatan of the Bojonegoro regency, the built-in reference list used
/// when the configuration does not point at a district file.
const DEFAULT_DISTRICTS: &[&str] = &[
    "Margomulyo",
    "Ngraho",
    "Tambakrejo",
    "Ngambon",
    "Sekar",
    "Bubulan",
    "Gondang",
    "Temayang",
    "Sugihwaras",
    "Kedungadem",
    "Kepohbaru",
    "Baureno",
    "Kanor",
    "Sumberejo",
    "Balen",
    "Sukosewu",
    "Kapas",
    "Bojonegoro",
    "Trucuk",
    "Dander",
    "Ngasem",
    "Kalitidu",
    "Malo",
    "Purwosari",
    "Padangan",
    "Kasiman",
    "Kedewan",
];

/// Normalize a raw district name to its canonical form. Idempotent: a name
/// that already carries the prefix is left alone.
pub fn canonical_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with(DISTRICT_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{DISTRICT_PREFIX}{trimmed}")
    }
}

/// Read-only list of valid districts. Report submission validates against
/// it and the per-year breakdown zero-fills from it.
#[derive(Debug, Clone)]
pub struct DistrictRegistry {
    names: BTreeSet<String>,
}

#[derive(Deserialize)]
struct DistrictFile {
    districts: Vec<String>,
}

impl Default for DistrictRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_DISTRICTS.iter().copied())
    }
}

impl DistrictRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| canonical_name(name.as_ref()))
            .filter(|name| name.len() > DISTRICT_PREFIX.len())
            .collect();
        Self { names }
    }

    /// Load a registry from a toml file with a single `districts` array.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ReportError::Config(format!(
                "failed to read district file {}: {err}",
                path.display()
            ))
        })?;
        let file: DistrictFile = toml::from_str(&contents)?;
        let registry = Self::new(file.districts);
        if registry.is_empty() {
            return Err(ReportError::Config(format!(
                "district file {} lists no districts",
                path.display()
            )));
        }
        Ok(registry)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.names.contains(canonical)
    }

    /// Districts in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
