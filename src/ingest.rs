use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use metrics::counter;
use tracing::{info, warn};

use crate::{
    district,
    error::{ReportError, Result},
    ledger::{AggregateRecord, DisasterCounts},
    store::ReportStore,
    validation,
};

/// Column headers of the BPS regency export this importer accepts.
pub const COLUMN_DISTRICT: &str = "Kecamatan";
pub const COLUMN_FLOOD: &str = "Jumlah Desa/Kelurahan yang Mengalami Bencana Alam - Banjir";
pub const COLUMN_EARTHQUAKE: &str = "Jumlah Desa/Kelurahan yang Mengalami Bencana Alam - Gempa Bumi";
pub const COLUMN_LANDSLIDE: &str =
    "Jumlah Desa/Kelurahan yang Mengalami Bencana Alam - Tanah Longsor";

pub const MAX_IMPORT_BYTES: usize = 8 * 1024 * 1024;

/// Merge one year of bulk data into the ledger. Rows naming the same
/// district are summed, then each group replaces any existing ledger row
/// for its (district, year) — a re-upload supersedes the previous one.
/// The whole payload is parsed before anything is written; a malformed
/// payload leaves the ledger untouched.
pub fn merge_year(store: &ReportStore, year: i32, data: &str) -> Result<usize> {
    validation::ensure_year(year)?;
    if data.len() > MAX_IMPORT_BYTES {
        return Err(ReportError::Validation(format!(
            "import payload exceeds maximum size of {MAX_IMPORT_BYTES} bytes"
        )));
    }

    let groups = parse_groups(data)?;

    let mut txn = store.begin();
    for (name, counts) in &groups {
        let slot = txn.ledger_entry(name, year)?;
        if let Some(existing) = slot {
            if existing.counts != *counts {
                warn!(
                    district = %name,
                    year,
                    "replacing existing aggregate row with imported totals"
                );
            }
        }
        *slot = if counts.is_zero() {
            None
        } else {
            Some(AggregateRecord::new(name.clone(), year, *counts))
        };
    }
    txn.commit()?;

    counter!("siaga_imports_total").increment(1);
    info!(year, groups = groups.len(), "bulk disaster data merged");
    Ok(groups.len())
}

fn parse_groups(data: &str) -> Result<BTreeMap<String, DisasterCounts>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader.headers().map_err(invalid_csv)?.clone();
    let district_idx = column_index(&headers, COLUMN_DISTRICT)?;
    let flood_idx = column_index(&headers, COLUMN_FLOOD)?;
    let earthquake_idx = column_index(&headers, COLUMN_EARTHQUAKE)?;
    let landslide_idx = column_index(&headers, COLUMN_LANDSLIDE)?;

    let mut groups: BTreeMap<String, DisasterCounts> = BTreeMap::new();
    for row in reader.records() {
        let row = row.map_err(invalid_csv)?;

        let raw_name = row.get(district_idx).unwrap_or("");
        if raw_name.trim().is_empty() {
            // Trailing filler rows in exported sheets carry no district.
            continue;
        }
        let name = district::canonical_name(raw_name);

        let row_counts = DisasterCounts {
            flood: parse_count(row.get(flood_idx), COLUMN_FLOOD)?,
            earthquake: parse_count(row.get(earthquake_idx), COLUMN_EARTHQUAKE)?,
            landslide: parse_count(row.get(landslide_idx), COLUMN_LANDSLIDE)?,
        };

        groups.entry(name).or_default().add(&row_counts);
    }

    Ok(groups)
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| ReportError::Validation(format!("missing column '{name}'")))
}

fn parse_count(cell: Option<&str>, column: &str) -> Result<u32> {
    let value = cell.unwrap_or("").trim();
    if value.is_empty() {
        return Ok(0);
    }
    value.parse::<u32>().map_err(|_| {
        ReportError::Validation(format!("invalid count '{value}' in column '{column}'"))
    })
}

fn invalid_csv(err: csv::Error) -> ReportError {
    ReportError::Validation(format!("invalid CSV payload: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> ReportStore {
        ReportStore::open(dir.path().join("store")).expect("store opens")
    }

    fn payload(rows: &[(&str, u32, u32, u32)]) -> String {
        let mut data = format!(
            "{COLUMN_DISTRICT},{COLUMN_FLOOD},{COLUMN_EARTHQUAKE},{COLUMN_LANDSLIDE}\n"
        );
        for (district, flood, earthquake, landslide) in rows {
            data.push_str(&format!("{district},{flood},{earthquake},{landslide}\n"));
        }
        data
    }

    #[test]
    fn duplicate_district_rows_are_summed() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let merged = merge_year(
            &store,
            2023,
            &payload(&[("Balen", 2, 0, 0), ("Balen", 3, 0, 0)]),
        )
        .unwrap();

        assert_eq!(merged, 1);
        let record = store.record("Kecamatan Balen", 2023).unwrap().unwrap();
        assert_eq!(record.counts.flood, 5);
    }

    #[test]
    fn reupload_replaces_rather_than_adds() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let data = payload(&[("Kanor", 4, 1, 0), ("Sekar", 0, 0, 2)]);
        merge_year(&store, 2023, &data).unwrap();
        merge_year(&store, 2023, &data).unwrap();

        let record = store.record("Kecamatan Kanor", 2023).unwrap().unwrap();
        assert_eq!(record.counts.flood, 4);
        assert_eq!(record.counts.earthquake, 1);

        let record = store.record("Kecamatan Sekar", 2023).unwrap().unwrap();
        assert_eq!(record.counts.landslide, 2);
    }

    #[test]
    fn missing_column_rejects_whole_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let data = format!("{COLUMN_DISTRICT},{COLUMN_FLOOD}\nBalen,2\n");
        let err = merge_year(&store, 2023, &data).unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
        assert!(store.record("Kecamatan Balen", 2023).unwrap().is_none());
    }

    #[test]
    fn unparsable_count_rejects_whole_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let data = payload(&[("Balen", 1, 0, 0)]) + "Kanor,banyak,0,0\n";
        let err = merge_year(&store, 2023, &data).unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));

        // Nothing was written, including the well-formed row.
        assert!(store.record("Kecamatan Balen", 2023).unwrap().is_none());
    }

    #[test]
    fn empty_cells_read_as_zero_and_blank_districts_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let data = format!(
            "{COLUMN_DISTRICT},{COLUMN_FLOOD},{COLUMN_EARTHQUAKE},{COLUMN_LANDSLIDE}\nMalo,,2,\n,9,9,9\n"
        );
        let merged = merge_year(&store, 2022, &data).unwrap();
        assert_eq!(merged, 1);

        let record = store.record("Kecamatan Malo", 2022).unwrap().unwrap();
        assert_eq!(record.counts.flood, 0);
        assert_eq!(record.counts.earthquake, 2);
        assert_eq!(record.counts.landslide, 0);
    }

    #[test]
    fn zero_total_group_clears_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        merge_year(&store, 2023, &payload(&[("Balen", 2, 0, 0)])).unwrap();
        merge_year(&store, 2023, &payload(&[("Balen", 0, 0, 0)])).unwrap();

        assert!(store.record("Kecamatan Balen", 2023).unwrap().is_none());
    }

    #[test]
    fn already_prefixed_districts_are_not_double_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        merge_year(&store, 2023, &payload(&[("Kecamatan Balen", 1, 0, 0)])).unwrap();
        let record = store.record("Kecamatan Balen", 2023).unwrap().unwrap();
        assert_eq!(record.counts.flood, 1);
    }

    #[test]
    fn out_of_range_year_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let err = merge_year(&store, 1500, &payload(&[("Balen", 1, 0, 0)])).unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
    }
}
