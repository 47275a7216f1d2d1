use std::{collections::BTreeMap, path::PathBuf};

use parking_lot::{Mutex, MutexGuard};
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use uuid::Uuid;

use crate::{
    error::{ReportError, Result},
    ledger::AggregateRecord,
    report::Report,
};

const SEP: u8 = 0x1F;
const PREFIX_REPORT: &str = "rpt";
const PREFIX_LEDGER: &str = "agg";

/// Persistence for both collections: submitted reports and the aggregate
/// ledger. Write operations go through a [`StoreTransaction`] so that a
/// report transition and its ledger adjustment land in one write batch.
pub struct ReportStore {
    db: DBWithThreadMode<MultiThreaded>,
    write_lock: Mutex<()>,
}

impl ReportStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DBWithThreadMode::<MultiThreaded>::open(&options, path)
            .map_err(|err| ReportError::Storage(err.to_string()))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Begin a read-modify-write unit. Taking the write lock here serializes
    /// concurrent operations that touch the same rows; the lock is released
    /// when the transaction commits or is dropped.
    pub fn begin(&self) -> StoreTransaction<'_> {
        StoreTransaction {
            store: self,
            _guard: self.write_lock.lock(),
            report_puts: Vec::new(),
            report_deletes: Vec::new(),
            ledger: BTreeMap::new(),
        }
    }

    pub fn report(&self, id: Uuid) -> Result<Option<Report>> {
        let value = self
            .db
            .get(report_key(&id))
            .map_err(|err| ReportError::Storage(err.to_string()))?;
        match value {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All reports, newest submission first.
    pub fn reports(&self) -> Result<Vec<Report>> {
        let prefix = report_prefix();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_slice(), Direction::Forward));

        let mut reports = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|err| ReportError::Storage(err.to_string()))?;
            if !key.starts_with(prefix.as_slice()) {
                break;
            }
            let report: Report = serde_json::from_slice(&value)?;
            reports.push(report);
        }

        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    pub fn record(&self, district: &str, year: i32) -> Result<Option<AggregateRecord>> {
        let value = self
            .db
            .get(record_key(district, year))
            .map_err(|err| ReportError::Storage(err.to_string()))?;
        match value {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All ledger rows for one year, ascending by district name.
    pub fn records_for_year(&self, year: i32) -> Result<Vec<AggregateRecord>> {
        let prefix = year_prefix(year);
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_slice(), Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|err| ReportError::Storage(err.to_string()))?;
            if !key.starts_with(prefix.as_slice()) {
                break;
            }
            let record: AggregateRecord = serde_json::from_slice(&value)?;
            records.push(record);
        }

        Ok(records)
    }
}

/// Buffered writes applied atomically on commit. Ledger rows are cached
/// read-through so successive adjustments to the same row within one
/// operation observe each other before anything is persisted.
pub struct StoreTransaction<'a> {
    store: &'a ReportStore,
    _guard: MutexGuard<'a, ()>,
    report_puts: Vec<Report>,
    report_deletes: Vec<Uuid>,
    ledger: BTreeMap<(String, i32), Option<AggregateRecord>>,
}

impl<'a> StoreTransaction<'a> {
    pub fn put_report(&mut self, report: &Report) {
        self.report_puts.push(report.clone());
    }

    pub fn delete_report(&mut self, id: Uuid) {
        self.report_deletes.push(id);
    }

    /// The ledger row for (district, year) as this transaction sees it:
    /// `None` means the row is absent (or tombstoned for deletion).
    pub fn ledger_entry(
        &mut self,
        district: &str,
        year: i32,
    ) -> Result<&mut Option<AggregateRecord>> {
        let key = (district.to_string(), year);
        if !self.ledger.contains_key(&key) {
            let current = self.store.record(district, year)?;
            self.ledger.insert(key.clone(), current);
        }
        Ok(self
            .ledger
            .get_mut(&key)
            .expect("ledger cache entry present after insert"))
    }

    /// Flush every buffered write in a single atomic batch. A transaction
    /// that is dropped instead writes nothing.
    pub fn commit(self) -> Result<()> {
        if self.report_puts.is_empty() && self.report_deletes.is_empty() && self.ledger.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();

        for report in &self.report_puts {
            batch.put(report_key(&report.id), serde_json::to_vec(report)?);
        }
        for id in &self.report_deletes {
            batch.delete(report_key(id));
        }
        for ((district, year), slot) in &self.ledger {
            match slot {
                Some(record) => {
                    batch.put(record_key(district, *year), serde_json::to_vec(record)?);
                }
                None => batch.delete(record_key(district, *year)),
            }
        }

        self.store
            .db
            .write(batch)
            .map_err(|err| ReportError::Storage(err.to_string()))
    }
}

fn report_prefix() -> Vec<u8> {
    let mut prefix = key_with_segments(&[PREFIX_REPORT]);
    prefix.push(SEP);
    prefix
}

fn report_key(id: &Uuid) -> Vec<u8> {
    key_with_segments(&[PREFIX_REPORT, &id.to_string()])
}

fn year_segment(year: i32) -> String {
    format!("{year:04}")
}

fn year_prefix(year: i32) -> Vec<u8> {
    let mut prefix = key_with_segments(&[PREFIX_LEDGER, &year_segment(year)]);
    prefix.push(SEP);
    prefix
}

fn record_key(district: &str, year: i32) -> Vec<u8> {
    key_with_segments(&[PREFIX_LEDGER, &year_segment(year), district])
}

fn key_with_segments(parts: &[&str]) -> Vec<u8> {
    let mut key = Vec::new();
    let mut iter = parts.iter();
    if let Some(first) = iter.next() {
        key.extend_from_slice(first.as_bytes());
    }
    for part in iter {
        key.push(SEP);
        key.extend_from_slice(part.as_bytes());
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::DisasterCounts,
        report::{DisasterType, ReportStatus},
    };
    use chrono::Utc;

    fn sample_report(district: &str, year: i32) -> Report {
        Report {
            id: Uuid::new_v4(),
            district: district.to_string(),
            disaster_type: DisasterType::Flood,
            description: "air meluap dari sungai".into(),
            year,
            status: ReportStatus::Pending,
            reporter_id: "citizen-1".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().join("store")).unwrap();

        let report = sample_report("Kecamatan Kapas", 2024);
        let mut txn = store.begin();
        txn.put_report(&report);
        txn.commit().unwrap();

        let loaded = store.report(report.id).unwrap().unwrap();
        assert_eq!(loaded, report);

        assert!(store.report(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn report_and_ledger_commit_in_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().join("store")).unwrap();

        let mut report = sample_report("Kecamatan Dander", 2024);
        report.status = ReportStatus::Verified;

        let mut txn = store.begin();
        txn.put_report(&report);
        let slot = txn.ledger_entry("Kecamatan Dander", 2024).unwrap();
        *slot = Some(AggregateRecord::new(
            "Kecamatan Dander",
            2024,
            DisasterCounts {
                flood: 1,
                ..DisasterCounts::default()
            },
        ));
        txn.commit().unwrap();

        assert!(store.report(report.id).unwrap().is_some());
        assert!(store.record("Kecamatan Dander", 2024).unwrap().is_some());
    }

    #[test]
    fn dropped_transaction_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().join("store")).unwrap();

        let report = sample_report("Kecamatan Balen", 2024);
        {
            let mut txn = store.begin();
            txn.put_report(&report);
            let slot = txn.ledger_entry("Kecamatan Balen", 2024).unwrap();
            *slot = Some(AggregateRecord::new(
                "Kecamatan Balen",
                2024,
                DisasterCounts {
                    landslide: 3,
                    ..DisasterCounts::default()
                },
            ));
            // No commit.
        }

        assert!(store.report(report.id).unwrap().is_none());
        assert!(store.record("Kecamatan Balen", 2024).unwrap().is_none());
    }

    #[test]
    fn year_scan_is_isolated_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().join("store")).unwrap();

        let mut txn = store.begin();
        for (district, year) in [
            ("Kecamatan Balen", 2023),
            ("Kecamatan Kanor", 2023),
            ("Kecamatan Balen", 2024),
        ] {
            let slot = txn.ledger_entry(district, year).unwrap();
            *slot = Some(AggregateRecord::new(
                district,
                year,
                DisasterCounts {
                    flood: 1,
                    ..DisasterCounts::default()
                },
            ));
        }
        txn.commit().unwrap();

        let rows = store.records_for_year(2023).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.year == 2023));

        let districts: Vec<&str> = rows.iter().map(|row| row.district.as_str()).collect();
        assert_eq!(districts, vec!["Kecamatan Balen", "Kecamatan Kanor"]);

        assert_eq!(store.records_for_year(2024).unwrap().len(), 1);
        assert!(store.records_for_year(2022).unwrap().is_empty());
    }

    #[test]
    fn reports_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::open(dir.path().join("store")).unwrap();

        let mut first = sample_report("Kecamatan Kapas", 2024);
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = sample_report("Kecamatan Malo", 2024);

        let mut txn = store.begin();
        txn.put_report(&first);
        txn.put_report(&second);
        txn.commit().unwrap();

        let reports = store.reports().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, second.id);
        assert_eq!(reports[1].id, first.id);
    }
}
