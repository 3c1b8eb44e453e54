use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::coerce::coerce_rows;
use crate::config::StoreConfig;
use crate::normalize::normalize_headers;
use crate::table::EmployeeTable;

pub mod csv;
pub mod parquet;
pub mod xlsx;

/// Format-agnostic intermediate: headers as read, cells as optional
/// strings. `None` marks a cell that was absent in the source (a Parquet
/// null, a short CSV row, an empty spreadsheet cell).
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Load the dataset from the first existing snapshot candidate, in
/// preference order (Parquet, then CSV, then XLSX). `Ok(None)` means no
/// candidate exists. A parse failure of the chosen candidate is an error;
/// the caller degrades to the not-loaded store rather than silently falling
/// through to a stale lower-preference file.
pub fn load_dataset(config: &StoreConfig) -> Result<Option<EmployeeTable>> {
    for path in config.snapshot_candidates() {
        if !path.is_file() {
            debug!(path = %path.display(), "snapshot candidate absent");
            continue;
        }
        let table = load_file(&path, config)
            .with_context(|| format!("loading dataset from {}", path.display()))?;
        info!(rows = table.len(), path = %path.display(), "employee dataset loaded");
        return Ok(Some(table));
    }
    Ok(None)
}

/// Read one dataset file (dispatched on extension) and run it through the
/// shared normalize + coerce pipeline. The Merger uses the same entry point
/// for uploads, so uploads and snapshots normalize identically.
pub fn load_file(path: &Path, config: &StoreConfig) -> Result<EmployeeTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let raw = match ext.as_str() {
        "parquet" => parquet::read_raw(path)?,
        "csv" => csv::read_raw(path)?,
        "xlsx" | "xls" => xlsx::read_raw(path)?,
        other => bail!("unsupported dataset format `{}`", other),
    };
    from_raw(raw, config)
}

/// Normalize headers, locate and rename the key column, coerce every cell.
pub fn from_raw(raw: RawTable, config: &StoreConfig) -> Result<EmployeeTable> {
    let headers = normalize_headers(&raw.headers, config)
        .ok_or_else(|| anyhow!("no employee id column among {:?}", raw.headers))?;
    let rows = coerce_rows(&headers, raw.rows, config);
    EmployeeTable::new(headers, rows)
}
