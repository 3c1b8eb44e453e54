use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{info, warn};

use crate::coerce::{coerce_rows, parse_date};
use crate::config::{StoreConfig, DOB_COLUMN};
use crate::error::StoreError;
use crate::load;
use crate::normalize::{id_candidates, is_valid_id, normalize_headers};
use crate::persist;
use crate::render::{self, ExitSummary};
use crate::table::{EmployeeTable, FieldValue};

/// What a merge did, for the caller's response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Incoming rows appended to the dataset.
    pub appended: usize,
    /// Incoming rows dropped because their key already existed.
    pub skipped_existing: usize,
    /// Rows in the dataset after the merge.
    pub total: usize,
}

/// Process-wide employee record store.
///
/// The active table is one fully-constructed generation behind an `RwLock`;
/// reload, merge and reset build the next generation completely and then
/// swap the reference, so a concurrent reader observes the old table or the
/// new one, never a partial mix. Single-process, one writer at a time;
/// concurrent writers need an external lock.
pub struct EmployeeStore {
    config: StoreConfig,
    table: RwLock<Option<Arc<EmployeeTable>>>,
}

impl EmployeeStore {
    /// An empty store; nothing is loaded until `reload`.
    pub fn new(config: StoreConfig) -> Self {
        EmployeeStore {
            config,
            table: RwLock::new(None),
        }
    }

    /// Construct and immediately attempt a load.
    pub fn open(config: StoreConfig) -> Self {
        let store = EmployeeStore::new(config);
        store.reload();
        store
    }

    /// Rebuild the table from the persisted dataset and swap it in. Any
    /// load failure degrades to the empty (not-loaded) store; queries then
    /// answer `NotLoaded` instead of crashing. Returns the row count.
    pub fn reload(&self) -> usize {
        let next = match load::load_dataset(&self.config) {
            Ok(Some(table)) => Some(Arc::new(table)),
            Ok(None) => {
                info!("no dataset snapshot present, store is empty");
                None
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "dataset load failed, store is empty");
                None
            }
        };
        let count = next.as_ref().map(|t| t.len()).unwrap_or(0);
        *self.table.write().unwrap() = next;
        count
    }

    pub fn is_loaded(&self) -> bool {
        self.table.read().unwrap().is_some()
    }

    /// Rows in the active generation; `None` when not loaded.
    pub fn row_count(&self) -> Option<usize> {
        self.table.read().unwrap().as_ref().map(|t| t.len())
    }

    fn current(&self) -> Result<Arc<EmployeeTable>, StoreError> {
        self.table
            .read()
            .unwrap()
            .clone()
            .ok_or(StoreError::NotLoaded)
    }

    /// Point lookup. The trimmed input and its leading-zero variant are
    /// both probed; two distinct stored keys matching the same query is a
    /// data-integrity condition and surfaces as `AmbiguousId`.
    pub fn lookup_by_id(&self, raw_id: &str) -> Result<Map<String, Value>, StoreError> {
        let table = self.current()?;
        let trimmed = raw_id.trim();
        if !is_valid_id(trimmed) {
            return Err(StoreError::InvalidId(raw_id.to_string()));
        }

        let mut found: Option<(String, usize)> = None;
        for candidate in id_candidates(trimmed) {
            if let Some(row) = table.get(&candidate) {
                match &found {
                    None => found = Some((candidate, row)),
                    Some((first, first_row)) if *first_row != row => {
                        return Err(StoreError::AmbiguousId {
                            query: trimmed.to_string(),
                            first: first.clone(),
                            second: candidate,
                        });
                    }
                    _ => {}
                }
            }
        }

        match found {
            Some((_, row)) => Ok(render::record_to_json(&table, row)),
            None => Err(StoreError::NotFound),
        }
    }

    /// Bulk lookup: one outcome object per input id; a bad id never aborts
    /// the batch. Only an unloaded store fails the call as a whole.
    pub fn lookup_many(&self, ids: &[String]) -> Result<Vec<Value>, StoreError> {
        self.current()?;
        let outcomes = ids
            .iter()
            .map(|id| {
                let mut entry = Map::new();
                entry.insert(
                    "Employee ID".to_string(),
                    Value::String(id.trim().to_string()),
                );
                match self.lookup_by_id(id) {
                    Ok(record) => {
                        entry.insert("Status".to_string(), Value::String("Found".to_string()));
                        entry.insert("Record".to_string(), Value::Object(record));
                    }
                    Err(e) => {
                        let status = match e {
                            StoreError::NotFound => "Not Found",
                            StoreError::InvalidId(_) => "Invalid ID",
                            StoreError::AmbiguousId { .. } => "Ambiguous",
                            _ => "Error",
                        };
                        entry.insert("Status".to_string(), Value::String(status.to_string()));
                    }
                }
                Value::Object(entry)
            })
            .collect();
        Ok(outcomes)
    }

    /// Set lookup by date of birth. Returns compact projections only; an
    /// empty match set is `NotFound`, distinct from a malformed date.
    pub fn lookup_by_dob(&self, raw_date: &str) -> Result<Vec<ExitSummary>, StoreError> {
        let table = self.current()?;
        let date =
            parse_date(raw_date).ok_or_else(|| StoreError::InvalidDate(raw_date.to_string()))?;

        let matches: Vec<ExitSummary> = (0..table.len())
            .filter(|&row| {
                table
                    .field(row, DOB_COLUMN)
                    .and_then(FieldValue::as_date)
                    .map(|d| d == date)
                    .unwrap_or(false)
            })
            .map(|row| render::exit_summary(&table, row))
            .collect();

        if matches.is_empty() {
            Err(StoreError::NotFound)
        } else {
            Ok(matches)
        }
    }

    /// Append an uploaded table to the dataset. The upload goes through the
    /// Loader's own normalize + coerce pipeline; rows whose key already
    /// exists are dropped (existing data wins). The merged table is
    /// persisted (Parquet, CSV on write failure) and the in-memory
    /// generation is reloaded wholesale.
    pub fn merge_upload(&self, path: &Path) -> Result<MergeReport, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let raw = match ext.as_str() {
            "csv" => load::csv::read_raw(path),
            "xlsx" | "xls" => load::xlsx::read_raw(path),
            _ => return Err(StoreError::UnsupportedFormat(ext)),
        }
        .map_err(StoreError::Merge)?;

        let headers =
            normalize_headers(&raw.headers, &self.config).ok_or(StoreError::MissingKeyColumn)?;
        let rows = coerce_rows(&headers, raw.rows, &self.config);
        let incoming = EmployeeTable::new(headers, rows).map_err(StoreError::Merge)?;

        // the persisted dataset is the merge baseline; an unreadable one is
        // an error, not an excuse to clobber it
        let existing = load::load_dataset(&self.config)
            .map_err(|e| StoreError::Merge(e.context("existing dataset unreadable")))?;

        let mut skipped = 0usize;
        let (columns, rows) = match existing {
            Some(existing) => {
                let columns = union_columns(existing.columns(), incoming.columns());
                let mut rows: Vec<Vec<FieldValue>> = existing
                    .rows()
                    .iter()
                    .map(|row| align_row(row, existing.columns(), &columns))
                    .collect();
                for i in 0..incoming.len() {
                    if existing.contains_key(incoming.key_of(i)) {
                        skipped += 1;
                        continue;
                    }
                    rows.push(align_row(&incoming.rows()[i], incoming.columns(), &columns));
                }
                (columns, rows)
            }
            None => (incoming.columns().to_vec(), incoming.rows().to_vec()),
        };

        let appended = incoming.len() - skipped;
        let merged = EmployeeTable::new(columns, rows).map_err(StoreError::Merge)?;
        let total = merged.len();

        let written = persist::persist_snapshot(&merged, &self.config).map_err(StoreError::Persist)?;
        self.reload();
        info!(
            appended,
            skipped,
            total,
            snapshot = %written.display(),
            "merge complete"
        );

        Ok(MergeReport {
            appended,
            skipped_existing: skipped,
            total,
        })
    }

    /// Delete every persisted representation and clear the in-memory table;
    /// queries observe not-loaded until the next load or merge. Returns how
    /// many files were removed.
    pub fn reset(&self) -> Result<usize, StoreError> {
        let removed = persist::clear_snapshots(&self.config).map_err(StoreError::Reset)?;
        *self.table.write().unwrap() = None;
        info!(removed, "store reset");
        Ok(removed)
    }
}

/// Existing columns first, then incoming-only columns in their order.
fn union_columns(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut columns = existing.to_vec();
    for column in incoming {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Re-shape one row onto the target column set; cells the source never had
/// become the sentinel.
fn align_row(
    row: &[FieldValue],
    source_columns: &[String],
    target_columns: &[String],
) -> Vec<FieldValue> {
    target_columns
        .iter()
        .map(|column| {
            source_columns
                .iter()
                .position(|c| c == column)
                .map(|i| row[i].clone())
                .unwrap_or(FieldValue::NotAvailable)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn test_store() -> (TempDir, EmployeeStore) {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            data_dir: dir.path().join("data"),
            ..StoreConfig::default()
        };
        let store = EmployeeStore::new(config);
        (dir, store)
    }

    fn seed_csv(store: &EmployeeStore, content: &str) {
        fs::create_dir_all(&store.config.data_dir).unwrap();
        fs::write(store.config.csv_path(), content).unwrap();
        store.reload();
    }

    const SCENARIO: &str = "Employee ID,Employee Name,DOB,FFS,Rehire\n\
                            010123456,John Doe,2000-05-20,0,No\n";

    #[test]
    fn queries_against_missing_dataset_report_not_loaded() {
        let (_dir, store) = test_store();
        store.reload();
        assert!(!store.is_loaded());
        assert!(matches!(
            store.lookup_by_id("010123456"),
            Err(StoreError::NotLoaded)
        ));
        assert!(matches!(
            store.lookup_by_dob("2000-05-20"),
            Err(StoreError::NotLoaded)
        ));
        assert!(matches!(
            store.lookup_many(&["1".to_string()]),
            Err(StoreError::NotLoaded)
        ));
    }

    #[test]
    fn corrupt_snapshot_degrades_to_not_loaded() {
        let (_dir, store) = test_store();
        fs::create_dir_all(&store.config.data_dir).unwrap();
        fs::write(store.config.parquet_path(), b"garbage").unwrap();
        assert_eq!(store.reload(), 0);
        assert!(matches!(
            store.lookup_by_id("1"),
            Err(StoreError::NotLoaded)
        ));
    }

    #[test]
    fn zero_pad_variants_resolve_to_the_same_record() {
        let (_dir, store) = test_store();
        seed_csv(&store, SCENARIO);

        let padded = store.lookup_by_id("010123456").unwrap();
        let bare = store.lookup_by_id("10123456").unwrap();
        assert_eq!(padded, bare);
        assert_eq!(padded["Employee ID"], "010123456");
        // whitespace around the query is trimmed, not rejected
        let spaced = store.lookup_by_id("  10123456 ").unwrap();
        assert_eq!(spaced, padded);
    }

    #[test]
    fn invalid_id_and_not_found_are_distinct_outcomes() {
        let (_dir, store) = test_store();
        seed_csv(&store, SCENARIO);

        assert!(matches!(
            store.lookup_by_id("   "),
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(
            store.lookup_by_id("12 34"),
            Err(StoreError::InvalidId(_))
        ));
        assert!(matches!(
            store.lookup_by_id("999999"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn colliding_padded_and_bare_keys_are_surfaced() {
        let (_dir, store) = test_store();
        seed_csv(
            &store,
            "Employee ID,Employee Name\n10,Bare\n010,Padded\n",
        );

        match store.lookup_by_id("10") {
            Err(StoreError::AmbiguousId { first, second, .. }) => {
                assert_eq!(first, "10");
                assert_eq!(second, "010");
            }
            other => panic!("expected AmbiguousId, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn dob_lookup_matches_the_scenario() {
        let (_dir, store) = test_store();
        seed_csv(&store, SCENARIO);

        let summaries = store.lookup_by_dob("2000-05-20").unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].employee_id, "010123456");
        assert_eq!(summaries[0].employee_name, Value::from("John Doe"));
        assert_eq!(summaries[0].ffs, Value::from(0.0));
        assert_eq!(summaries[0].rehire, Value::from("No"));

        assert!(matches!(
            store.lookup_by_dob("2000-05-21"),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.lookup_by_dob("whenever"),
            Err(StoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn dob_formats_are_tolerated_at_the_query_boundary() {
        let (_dir, store) = test_store();
        seed_csv(&store, SCENARIO);
        assert_eq!(store.lookup_by_dob("20-May-2000").unwrap().len(), 1);
        assert_eq!(store.lookup_by_dob("20/05/2000").unwrap().len(), 1);
    }

    #[test]
    fn merge_appends_dedupes_and_reloads() -> Result<()> {
        let (dir, store) = test_store();
        seed_csv(
            &store,
            "Employee ID,Employee Name\n1,Existing One\n2,Existing Two\n",
        );

        let upload = dir.path().join("upload.csv");
        fs::write(
            &upload,
            "Emp ID,Employee Name,DOB\n2,Conflicting Two,1990-01-01\n3,New Three,1991-02-02\n",
        )?;

        let report = store.merge_upload(&upload)?;
        assert_eq!(
            report,
            MergeReport {
                appended: 1,
                skipped_existing: 1,
                total: 3
            }
        );

        // existing data won the collision
        let two = store.lookup_by_id("2")?;
        assert_eq!(two["Employee Name"], "Existing Two");
        // the colliding row's extra column did not bleed into the record
        assert_eq!(two["DOB"], "Not Available");
        // the new row is queryable, with its column-union fields in place
        let three = store.lookup_by_id("3")?;
        assert_eq!(three["DOB"], "02-Feb-1991");

        // persisted as the columnar snapshot; the seeded csv is gone
        assert!(store.config.parquet_path().is_file());
        assert!(!store.config.csv_path().exists());
        Ok(())
    }

    #[test]
    fn merge_is_idempotent() -> Result<()> {
        let (dir, store) = test_store();
        let upload = dir.path().join("upload.csv");
        fs::write(
            &upload,
            "Employee ID,Employee Name\n1,One\n2,Two\n",
        )?;

        let first = store.merge_upload(&upload)?;
        assert_eq!(first.appended, 2);
        assert_eq!(first.total, 2);

        let second = store.merge_upload(&upload)?;
        assert_eq!(second.appended, 0);
        assert_eq!(second.skipped_existing, 2);
        assert_eq!(second.total, 2);
        assert_eq!(store.row_count(), Some(2));
        Ok(())
    }

    #[test]
    fn merge_into_empty_store_loads_it() -> Result<()> {
        let (dir, store) = test_store();
        assert!(!store.is_loaded());

        let upload = dir.path().join("upload.csv");
        fs::write(&upload, SCENARIO)?;
        store.merge_upload(&upload)?;

        assert!(store.is_loaded());
        assert!(store.lookup_by_id("10123456").is_ok());
        Ok(())
    }

    #[test]
    fn merge_rejects_bad_uploads_descriptively() -> Result<()> {
        let (dir, store) = test_store();

        let txt = dir.path().join("upload.txt");
        fs::write(&txt, "whatever")?;
        assert!(matches!(
            store.merge_upload(&txt),
            Err(StoreError::UnsupportedFormat(_))
        ));

        let keyless = dir.path().join("keyless.csv");
        fs::write(&keyless, "Name,DOB\nJohn,2000-05-20\n")?;
        assert!(matches!(
            store.merge_upload(&keyless),
            Err(StoreError::MissingKeyColumn)
        ));
        Ok(())
    }

    #[test]
    fn bulk_lookup_reports_per_id_outcomes() {
        let (_dir, store) = test_store();
        seed_csv(&store, SCENARIO);

        let outcomes = store
            .lookup_many(&[
                "10123456".to_string(),
                "999999".to_string(),
                "!!".to_string(),
            ])
            .unwrap();
        assert_eq!(outcomes[0]["Status"], "Found");
        assert_eq!(outcomes[0]["Record"]["Employee ID"], "010123456");
        assert_eq!(outcomes[1]["Status"], "Not Found");
        assert_eq!(outcomes[2]["Status"], "Invalid ID");
    }

    #[test]
    fn reset_clears_disk_and_memory() -> Result<()> {
        let (dir, store) = test_store();
        let upload = dir.path().join("upload.csv");
        fs::write(&upload, SCENARIO)?;
        store.merge_upload(&upload)?;
        assert!(store.is_loaded());

        let removed = store.reset()?;
        assert!(removed >= 1);
        assert!(!store.is_loaded());
        assert!(matches!(
            store.lookup_by_id("10123456"),
            Err(StoreError::NotLoaded)
        ));
        for candidate in store.config.snapshot_candidates() {
            assert!(!candidate.exists());
        }
        Ok(())
    }

    #[test]
    fn record_projection_renders_dates_and_sentinel() {
        let (_dir, store) = test_store();
        seed_csv(
            &store,
            "Employee ID,Employee Name,DOJ,Last Working Date,FFS\n\
             7,Jane Roe,2015-03-01,,pending\n",
        );

        let record = store.lookup_by_id("7").unwrap();
        assert_eq!(record["DOJ"], "01-Mar-2015");
        assert_eq!(record["Last Working Date"], "Not Available");
        // unparseable amount coerced to the sentinel at load time
        assert_eq!(record["FFS"], "Not Available");
    }
}
