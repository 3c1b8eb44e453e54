use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::table::{EmployeeTable, FieldValue, NOT_AVAILABLE};

/// Dates render as `DD-MMM-YYYY` (e.g. `20-May-2000`) everywhere the store
/// is read over the wire.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// One field, rendered for a JSON projection.
pub fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Number(n) => match Number::from_f64(*n) {
            Some(num) => Value::Number(num),
            None => Value::String(n.to_string()),
        },
        FieldValue::Date(d) => Value::String(format_date(*d)),
        FieldValue::NotAvailable => Value::String(NOT_AVAILABLE.to_string()),
    }
}

/// Full field-for-field projection of one record, in column order.
pub fn record_to_json(table: &EmployeeTable, row: usize) -> Map<String, Value> {
    let mut map = Map::new();
    for (column, value) in table.record(row) {
        map.insert(column.to_string(), field_to_json(value));
    }
    map
}

/// Compact projection returned by DOB lookups: never the full record.
#[derive(Debug, Serialize)]
pub struct ExitSummary {
    #[serde(rename = "Employee Name")]
    pub employee_name: Value,
    #[serde(rename = "Employee ID")]
    pub employee_id: String,
    #[serde(rename = "Rehire")]
    pub rehire: Value,
    #[serde(rename = "FFS")]
    pub ffs: Value,
}

pub fn exit_summary(table: &EmployeeTable, row: usize) -> ExitSummary {
    let field = |name: &str| {
        table
            .field(row, name)
            .map(field_to_json)
            .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
    };
    ExitSummary {
        employee_name: field("Employee Name"),
        employee_id: table.key_of(row).to_string(),
        rehire: field("Rehire"),
        ffs: field("FFS"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ID_COLUMN;

    #[test]
    fn dates_render_day_month_year() {
        let d = NaiveDate::from_ymd_opt(2000, 5, 20).unwrap();
        assert_eq!(format_date(d), "20-May-2000");
        assert_eq!(
            field_to_json(&FieldValue::Date(d)),
            Value::String("20-May-2000".to_string())
        );
    }

    #[test]
    fn sentinel_and_numbers_render() {
        assert_eq!(
            field_to_json(&FieldValue::NotAvailable),
            Value::String("Not Available".to_string())
        );
        assert_eq!(field_to_json(&FieldValue::Number(0.0)), Value::from(0.0));
    }

    #[test]
    fn summary_projects_missing_columns_as_not_available() {
        // a table without Rehire or FFS columns at all
        let table = EmployeeTable::new(
            vec![ID_COLUMN.to_string(), "Employee Name".to_string()],
            vec![vec![
                FieldValue::Text("010123456".to_string()),
                FieldValue::Text("John Doe".to_string()),
            ]],
        )
        .unwrap();
        let summary = exit_summary(&table, 0);
        assert_eq!(summary.employee_id, "010123456");
        assert_eq!(summary.rehire, Value::String("Not Available".to_string()));
        assert_eq!(summary.ffs, Value::String("Not Available".to_string()));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["Employee Name"], "John Doe");
        assert_eq!(json["Employee ID"], "010123456");
    }
}
