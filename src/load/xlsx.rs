use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use crate::load::RawTable;

/// Read the first sheet of a workbook into a string table. The first row
/// is the header row; every other cell is rendered to text and re-typed by
/// the shared coercion pass.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook {} has no sheets", path.display()))?
        .with_context(|| format!("reading first sheet of {}", path.display()))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .ok_or_else(|| anyhow!("workbook {} has an empty first sheet", path.display()))?
        .iter()
        .map(|cell| cell_to_string(cell).unwrap_or_default())
        .collect();

    let rows: Vec<Vec<Option<String>>> = row_iter
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

/// Render one spreadsheet cell to text. Numeric cells print without a
/// trailing `.0` (spreadsheet tools habitually store ids as floats), date
/// cells print in ISO form, error cells count as absent.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| {
            if ndt.time() == chrono::NaiveTime::MIN {
                ndt.date().format("%Y-%m-%d").to_string()
            } else {
                ndt.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
        Data::Error(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::load::from_raw;
    use crate::table::FieldValue;
    use chrono::NaiveDate;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn first_sheet_loads_with_float_ids() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("upload.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Emp ID").unwrap();
        sheet.write_string(0, 1, "Employee Name").unwrap();
        sheet.write_string(0, 2, "DOB").unwrap();
        sheet.write_string(0, 3, "FFS").unwrap();
        // ids exported by spreadsheet tools arrive as numbers
        sheet.write_number(1, 0, 10123456.0).unwrap();
        sheet.write_string(1, 1, "John Doe").unwrap();
        sheet.write_string(1, 2, "2000-05-20").unwrap();
        sheet.write_number(1, 3, 45678.0).unwrap();
        workbook.save(&path).unwrap();

        let raw = read_raw(&path)?;
        assert_eq!(raw.headers[0], "Emp ID");
        assert_eq!(raw.rows[0][0].as_deref(), Some("10123456"));

        let table = from_raw(raw, &StoreConfig::default())?;
        let row = table.get("10123456").expect("numeric id stored as text");
        assert_eq!(
            table.field(row, "DOB").unwrap().as_date(),
            Some(NaiveDate::from_ymd_opt(2000, 5, 20).unwrap())
        );
        assert_eq!(
            table.field(row, "FFS"),
            Some(&FieldValue::Number(45678.0))
        );
        Ok(())
    }
}
