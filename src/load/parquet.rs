use anyhow::{Context, Result};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{fs::File, path::Path};

use crate::load::RawTable;

const BATCH_SIZE: usize = 8192;

/// Read a Parquet snapshot into a string table. Typed columns (Date32,
/// Float64) are rendered to their canonical text form and re-coerced by the
/// shared pipeline, so every format takes the identical path after this
/// point. Nulls map to absent cells.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let file =
        File::open(path).with_context(|| format!("opening parquet file {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;

    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let reader = builder
        .with_batch_size(BATCH_SIZE)
        .build()
        .context("building parquet record batch reader")?;

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for batch in reader {
        let batch = batch.context("reading parquet batch")?;
        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(batch.num_columns());
            for col in batch.columns() {
                if col.is_null(row) {
                    cells.push(None);
                } else {
                    let text = array_value_to_string(col, row)
                        .context("rendering parquet cell to text")?;
                    cells.push(Some(text));
                }
            }
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}
