use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    district::{self, DistrictRegistry},
    error::{ReportError, Result},
    ingest,
    ledger::{self, DisasterCounts},
    report::{Report, ReportDraft, ReportPatch, ReportStatus},
    store::ReportStore,
    validation,
};

/// Per-type totals across every district for one year, plus the number of
/// known districts (independent of whether they have ledger rows).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct YearTotals {
    pub year: i32,
    pub districts: usize,
    pub flood: u64,
    pub earthquake: u64,
    pub landslide: u64,
    pub total: u64,
}

/// One breakdown entry per known district; districts without a ledger row
/// surface as zeros rather than being absent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DistrictBreakdown {
    pub district: String,
    #[serde(flatten)]
    pub counts: DisasterCounts,
}

/// Report lifecycle operations and the ledger read side, layered over the
/// store so HTTP handlers and CLI commands share one consistent API.
#[derive(Clone)]
pub struct CoreService {
    store: Arc<ReportStore>,
    districts: Arc<DistrictRegistry>,
}

impl CoreService {
    pub fn new(store: Arc<ReportStore>, districts: Arc<DistrictRegistry>) -> Self {
        Self { store, districts }
    }

    pub fn store(&self) -> Arc<ReportStore> {
        Arc::clone(&self.store)
    }

    pub fn districts(&self) -> Arc<DistrictRegistry> {
        Arc::clone(&self.districts)
    }

    fn canonical_district(&self, raw: &str) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(ReportError::Validation("district must not be empty".into()));
        }
        let canonical = district::canonical_name(raw);
        if !self.districts.contains(&canonical) {
            return Err(ReportError::Validation(format!(
                "unknown district '{}'",
                raw.trim()
            )));
        }
        Ok(canonical)
    }

    /// Create a report in pending state. No ledger effect until an admin
    /// verifies it.
    pub fn submit(&self, reporter_id: &str, draft: ReportDraft) -> Result<Report> {
        validation::ensure_reporter_id(reporter_id)?;
        validation::ensure_year(draft.year)?;
        validation::ensure_description(&draft.description)?;
        let district = self.canonical_district(&draft.district)?;

        let report = Report {
            id: Uuid::new_v4(),
            district,
            disaster_type: draft.disaster_type,
            description: draft.description,
            year: draft.year,
            status: ReportStatus::Pending,
            reporter_id: reporter_id.trim().to_string(),
            created_at: Utc::now(),
        };

        let mut txn = self.store.begin();
        txn.put_report(&report);
        txn.commit()?;

        counter!("siaga_reports_submitted_total").increment(1);
        info!(report_id = %report.id, district = %report.district, "report submitted");
        Ok(report)
    }

    pub fn report(&self, id: Uuid) -> Result<Report> {
        self.store.report(id)?.ok_or(ReportError::ReportNotFound)
    }

    pub fn reports(&self) -> Result<Vec<Report>> {
        self.store.reports()
    }

    /// Promote a pending report to verified and count it in the ledger.
    /// Verifying an already-verified report changes nothing; a rejected
    /// report must be edited back first.
    pub fn verify(&self, id: Uuid) -> Result<Report> {
        let mut txn = self.store.begin();
        let mut report = self.report(id)?;

        match report.status {
            ReportStatus::Verified => return Ok(report),
            ReportStatus::Rejected => {
                return Err(ReportError::Conflict(
                    "report is rejected; edit its status to verify it".into(),
                ));
            }
            ReportStatus::Pending => {}
        }

        report.status = ReportStatus::Verified;
        ledger::add(&mut txn, &report.district, report.year, report.disaster_type)?;
        txn.put_report(&report);
        txn.commit()?;

        counter!("siaga_reports_verified_total").increment(1);
        info!(report_id = %report.id, district = %report.district, year = report.year, "report verified");
        Ok(report)
    }

    /// Mark a report rejected. A previously verified report is removed from
    /// the ledger using its pre-transition district/year/type.
    pub fn reject(&self, id: Uuid) -> Result<Report> {
        let mut txn = self.store.begin();
        let mut report = self.report(id)?;

        if report.status == ReportStatus::Rejected {
            return Ok(report);
        }

        if report.status == ReportStatus::Verified {
            ledger::remove(&mut txn, &report.district, report.year, report.disaster_type)?;
        }
        report.status = ReportStatus::Rejected;
        txn.put_report(&report);
        txn.commit()?;

        counter!("siaga_reports_rejected_total").increment(1);
        info!(report_id = %report.id, "report rejected");
        Ok(report)
    }

    /// Apply a partial update. The ledger is reconciled against the full
    /// before/after diff: the old triple is retracted if the report was
    /// verified, the new triple counted if it still is. An edit that leaves
    /// a verified report's district/year/type untouched adjusts nothing.
    pub fn edit(&self, id: Uuid, patch: ReportPatch) -> Result<Report> {
        if patch.is_empty() {
            return Err(ReportError::Validation("edit contains no fields".into()));
        }

        let mut txn = self.store.begin();
        let old = self.report(id)?;
        let mut updated = old.clone();

        if let Some(district) = &patch.district {
            updated.district = self.canonical_district(district)?;
        }
        if let Some(kind) = patch.disaster_type {
            updated.disaster_type = kind;
        }
        if let Some(description) = patch.description {
            validation::ensure_description(&description)?;
            updated.description = description;
        }
        if let Some(year) = patch.year {
            validation::ensure_year(year)?;
            updated.year = year;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }

        let old_triple = (old.district.as_str(), old.year, old.disaster_type);
        let new_triple = (updated.district.as_str(), updated.year, updated.disaster_type);
        let both_verified =
            old.status == ReportStatus::Verified && updated.status == ReportStatus::Verified;

        if !(both_verified && old_triple == new_triple) {
            if old.status == ReportStatus::Verified {
                ledger::remove(&mut txn, &old.district, old.year, old.disaster_type)?;
            }
            if updated.status == ReportStatus::Verified {
                ledger::add(
                    &mut txn,
                    &updated.district,
                    updated.year,
                    updated.disaster_type,
                )?;
            }
        }

        txn.put_report(&updated);
        txn.commit()?;

        counter!("siaga_reports_edited_total").increment(1);
        info!(report_id = %updated.id, status = %updated.status, "report edited");
        Ok(updated)
    }

    /// Remove a report; a verified one is simultaneously retracted from the
    /// ledger so the two collections can never disagree.
    pub fn delete(&self, id: Uuid) -> Result<Report> {
        let mut txn = self.store.begin();
        let report = self.report(id)?;

        txn.delete_report(report.id);
        if report.status == ReportStatus::Verified {
            ledger::remove(&mut txn, &report.district, report.year, report.disaster_type)?;
        }
        txn.commit()?;

        counter!("siaga_reports_deleted_total").increment(1);
        info!(report_id = %report.id, "report deleted");
        Ok(report)
    }

    /// Merge one year of bulk tabular data into the ledger. Returns the
    /// number of distinct district groups written.
    pub fn import_csv(&self, year: i32, data: &str) -> Result<usize> {
        ingest::merge_year(&self.store, year, data)
    }

    pub fn totals_for_year(&self, year: i32) -> Result<YearTotals> {
        let mut flood: u64 = 0;
        let mut earthquake: u64 = 0;
        let mut landslide: u64 = 0;

        for record in self.store.records_for_year(year)? {
            flood += u64::from(record.counts.flood);
            earthquake += u64::from(record.counts.earthquake);
            landslide += u64::from(record.counts.landslide);
        }

        Ok(YearTotals {
            year,
            districts: self.districts.len(),
            flood,
            earthquake,
            landslide,
            total: flood + earthquake + landslide,
        })
    }

    pub fn breakdown_for_year(&self, year: i32) -> Result<Vec<DistrictBreakdown>> {
        let mut by_district: BTreeMap<String, DisasterCounts> = BTreeMap::new();
        for record in self.store.records_for_year(year)? {
            by_district.insert(record.district, record.counts);
        }

        Ok(self
            .districts
            .iter()
            .map(|name| DistrictBreakdown {
                district: name.to_string(),
                counts: by_district.get(name).copied().unwrap_or_default(),
            })
            .collect())
    }
}
