use serde::{Deserialize, Serialize};

use crate::{error::Result, report::DisasterType, store::StoreTransaction};

/// Per-type occurrence counters for one (district, year) ledger row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterCounts {
    pub flood: u32,
    pub earthquake: u32,
    pub landslide: u32,
}

impl DisasterCounts {
    pub fn get(&self, kind: DisasterType) -> u32 {
        match kind {
            DisasterType::Flood => self.flood,
            DisasterType::Earthquake => self.earthquake,
            DisasterType::Landslide => self.landslide,
        }
    }

    fn slot_mut(&mut self, kind: DisasterType) -> &mut u32 {
        match kind {
            DisasterType::Flood => &mut self.flood,
            DisasterType::Earthquake => &mut self.earthquake,
            DisasterType::Landslide => &mut self.landslide,
        }
    }

    pub fn increment(&mut self, kind: DisasterType) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(1);
    }

    /// Decrement floored at zero; counters never go negative.
    pub fn decrement(&mut self, kind: DisasterType) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_sub(1);
    }

    pub fn add(&mut self, other: &DisasterCounts) {
        self.flood = self.flood.saturating_add(other.flood);
        self.earthquake = self.earthquake.saturating_add(other.earthquake);
        self.landslide = self.landslide.saturating_add(other.landslide);
    }

    pub fn is_zero(&self) -> bool {
        self.flood == 0 && self.earthquake == 0 && self.landslide == 0
    }

    pub fn total(&self) -> u64 {
        u64::from(self.flood) + u64::from(self.earthquake) + u64::from(self.landslide)
    }
}

/// One materialized ledger row. Rows with all counters at zero are never
/// stored; deleting the row is how the ledger says "nothing happened here".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub district: String,
    pub year: i32,
    #[serde(flatten)]
    pub counts: DisasterCounts,
}

impl AggregateRecord {
    pub fn new(district: impl Into<String>, year: i32, counts: DisasterCounts) -> Self {
        Self {
            district: district.into(),
            year,
            counts,
        }
    }

    fn seed(district: &str, year: i32, kind: DisasterType) -> Self {
        let mut counts = DisasterCounts::default();
        counts.increment(kind);
        Self::new(district, year, counts)
    }
}

/// Record one more verified occurrence of `kind` for (district, year),
/// creating the ledger row on first use.
pub fn add(
    txn: &mut StoreTransaction<'_>,
    district: &str,
    year: i32,
    kind: DisasterType,
) -> Result<()> {
    let slot = txn.ledger_entry(district, year)?;
    match slot {
        Some(record) => record.counts.increment(kind),
        None => *slot = Some(AggregateRecord::seed(district, year, kind)),
    }
    Ok(())
}

/// Retract one occurrence of `kind` for (district, year). A missing row is
/// a no-op: the ledger already reflects the report's absence. A row whose
/// counters all reach zero is deleted rather than kept.
pub fn remove(
    txn: &mut StoreTransaction<'_>,
    district: &str,
    year: i32,
    kind: DisasterType,
) -> Result<()> {
    let slot = txn.ledger_entry(district, year)?;
    if let Some(record) = slot {
        record.counts.decrement(kind);
        if record.counts.is_zero() {
            *slot = None;
        }
    }
    Ok(())
}
