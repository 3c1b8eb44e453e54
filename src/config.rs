use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Canonical name the detected employee-identifier column is renamed to.
pub const ID_COLUMN: &str = "Employee ID";

/// Column equality-matched by date-of-birth lookups.
pub const DOB_COLUMN: &str = "DOB";

/// Basename shared by every snapshot format (`employees.parquet`, …).
pub const SNAPSHOT_STEM: &str = "employees";

/// Store configuration, loadable from YAML, with defaults matching the HR
/// dataset layout. The alias list is the explicit column mapping; the
/// substring heuristic in `normalize` is only the documented fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the persisted dataset snapshots.
    pub data_dir: PathBuf,
    /// Header spellings accepted as the employee-identifier column.
    pub id_aliases: Vec<String>,
    /// Columns coerced to calendar dates.
    pub date_columns: Vec<String>,
    /// Columns coerced to numeric amounts.
    pub amount_columns: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: PathBuf::from("data"),
            id_aliases: vec![
                "Employee ID".to_string(),
                "Employee Id".to_string(),
                "Emp ID".to_string(),
                "EMP ID".to_string(),
                "Employee Number".to_string(),
            ],
            date_columns: vec![
                "DOJ".to_string(),
                "Last Working Date".to_string(),
                "DOB".to_string(),
            ],
            amount_columns: vec!["FFS".to_string()],
        }
    }
}

impl StoreConfig {
    /// Read a YAML config file; missing keys fall back to the defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.parquet", SNAPSHOT_STEM))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.csv", SNAPSHOT_STEM))
    }

    pub fn xlsx_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.xlsx", SNAPSHOT_STEM))
    }

    /// Snapshot files in load-preference order: columnar binary first,
    /// then CSV, then spreadsheet.
    pub fn snapshot_candidates(&self) -> [PathBuf; 3] {
        [self.parquet_path(), self.csv_path(), self.xlsx_path()]
    }

    pub fn is_date_column(&self, name: &str) -> bool {
        self.date_columns.iter().any(|c| c == name)
    }

    pub fn is_amount_column(&self, name: &str) -> bool {
        self.amount_columns.iter().any(|c| c == name)
    }
}
