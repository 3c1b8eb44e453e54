use anyhow::{anyhow, Context, Result};
use arrow::array::{ArrayRef, Date32Builder, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::warn;

use crate::config::{StoreConfig, SNAPSHOT_STEM};
use crate::table::{EmployeeTable, FieldValue, NOT_AVAILABLE};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

/// Typed Arrow batch for the Parquet snapshot: configured date columns as
/// Date32, amount columns as Float64, everything else Utf8. The sentinel
/// persists as a real null.
fn typed_batch(table: &EmployeeTable, config: &StoreConfig) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for (idx, name) in table.columns().iter().enumerate() {
        if config.is_date_column(name) {
            let mut builder = Date32Builder::new();
            for row in table.rows() {
                match &row[idx] {
                    FieldValue::Date(d) => {
                        builder.append_value((*d - epoch()).num_days() as i32)
                    }
                    _ => builder.append_null(),
                }
            }
            fields.push(Field::new(name, DataType::Date32, true));
            arrays.push(Arc::new(builder.finish()));
        } else if config.is_amount_column(name) {
            let mut builder = Float64Builder::new();
            for row in table.rows() {
                match &row[idx] {
                    FieldValue::Number(n) => builder.append_value(*n),
                    _ => builder.append_null(),
                }
            }
            fields.push(Field::new(name, DataType::Float64, true));
            arrays.push(Arc::new(builder.finish()));
        } else {
            let mut builder = StringBuilder::new();
            for row in table.rows() {
                match &row[idx] {
                    FieldValue::Text(s) => builder.append_value(s),
                    FieldValue::Number(n) => builder.append_value(n.to_string()),
                    FieldValue::Date(d) => builder.append_value(d.format("%Y-%m-%d").to_string()),
                    FieldValue::NotAvailable => builder.append_null(),
                }
            }
            fields.push(Field::new(name, DataType::Utf8, true));
            arrays.push(Arc::new(builder.finish()));
        }
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("building snapshot record batch")
}

/// All-Utf8 batch for the CSV fallback. CSV cannot encode nulls, so the
/// sentinel is written as its literal text and folded back on load.
fn text_batch(table: &EmployeeTable) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, false))
        .collect();

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.len());
    for idx in 0..table.columns().len() {
        let mut builder = StringBuilder::new();
        for row in table.rows() {
            match &row[idx] {
                FieldValue::Text(s) => builder.append_value(s),
                FieldValue::Number(n) => builder.append_value(n.to_string()),
                FieldValue::Date(d) => builder.append_value(d.format("%Y-%m-%d").to_string()),
                FieldValue::NotAvailable => builder.append_value(NOT_AVAILABLE),
            }
        }
        arrays.push(Arc::new(builder.finish()));
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("building csv snapshot batch")
}

/// Write the Parquet snapshot through a temp file, renaming only once the
/// writer has closed cleanly, so a crash never leaves a torn snapshot at
/// the canonical path.
pub fn write_parquet(table: &EmployeeTable, config: &StoreConfig, path: &Path) -> Result<()> {
    let batch = typed_batch(table, config)?;
    let tmp_path = path.with_extension("parquet.tmp");

    let tmp_file = File::create(&tmp_path)
        .with_context(|| format!("creating temporary file {}", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(tmp_file), batch.schema(), Some(props))
        .context("creating parquet writer for snapshot")?;
    writer.write(&batch).context("writing snapshot batch")?;
    writer.close().context("closing parquet snapshot writer")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
    Ok(())
}

/// CSV fallback snapshot, same temp-then-rename protocol.
pub fn write_csv(table: &EmployeeTable, path: &Path) -> Result<()> {
    let batch = text_batch(table)?;
    let tmp_path = path.with_extension("csv.tmp");

    let tmp_file = File::create(&tmp_path)
        .with_context(|| format!("creating temporary file {}", tmp_path.display()))?;
    {
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(tmp_file);
        writer.write(&batch).context("writing csv snapshot")?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
    Ok(())
}

/// Persist the dataset: Parquet preferred, CSV on Parquet failure. On
/// success, other-format leftovers from earlier generations are removed so
/// the load preference order cannot resurrect stale data. Returns the path
/// actually written.
pub fn persist_snapshot(table: &EmployeeTable, config: &StoreConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let parquet_path = config.parquet_path();
    match write_parquet(table, config, &parquet_path) {
        Ok(()) => {
            remove_stale(&[config.csv_path(), config.xlsx_path()]);
            Ok(parquet_path)
        }
        Err(parquet_err) => {
            warn!(error = %format!("{:#}", parquet_err), "parquet snapshot failed, falling back to csv");
            let csv_path = config.csv_path();
            match write_csv(table, &csv_path) {
                Ok(()) => {
                    remove_stale(&[parquet_path, config.xlsx_path()]);
                    Ok(csv_path)
                }
                Err(csv_err) => Err(anyhow!(
                    "parquet write failed ({:#}); csv fallback failed ({:#})",
                    parquet_err,
                    csv_err
                )),
            }
        }
    }
}

fn remove_stale(paths: &[PathBuf]) {
    for path in paths {
        if path.is_file() {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "could not remove stale snapshot");
            }
        }
    }
}

/// Delete every persisted representation of the dataset (all formats plus
/// leftover temp files). Returns how many files were removed.
pub fn clear_snapshots(config: &StoreConfig) -> Result<usize> {
    let pattern = format!("{}/{}.*", config.data_dir.display(), SNAPSHOT_STEM);
    let mut removed = 0;
    for entry in glob(&pattern).context("invalid snapshot glob pattern")? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "cannot read glob entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        fs::remove_file(&path)
            .with_context(|| format!("deleting snapshot {}", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}
