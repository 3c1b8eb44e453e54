use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use std::{fs, io::Cursor, path::Path, sync::Arc};

use crate::load::RawTable;
use crate::normalize::clean_cell;

const BATCH_SIZE: usize = 8192;

/// Read a CSV file into a string table. The header line defines an
/// all-Utf8 schema; typing happens later in the shared coercion pass.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading csv file {}", path.display()))?;

    let header_line = match content.lines().next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => bail!("csv file {} has no header line", path.display()),
    };
    let headers: Vec<String> = header_line.split(',').map(|h| clean_cell(h)).collect();

    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_escape(b'"')
        .with_delimiter(b',')
        .build(Cursor::new(content.as_bytes()))
        .context("creating csv reader")?;

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for batch in reader {
        let batch = batch.context("reading csv batch")?;
        let columns: Vec<&StringArray> = batch
            .columns()
            .iter()
            .map(|col| {
                col.as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| anyhow!("csv column decoded to a non-string array"))
            })
            .collect::<Result<_>>()?;
        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|col| {
                        if col.is_null(row) {
                            None
                        } else {
                            Some(col.value(row).to_string())
                        }
                    })
                    .collect(),
            );
        }
    }

    Ok(RawTable { headers, rows })
}
