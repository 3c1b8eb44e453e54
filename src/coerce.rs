use chrono::NaiveDate;

use crate::config::StoreConfig;
use crate::normalize::clean_cell;
use crate::table::{FieldValue, NOT_AVAILABLE};

/// Date spellings seen across the upstream HR exports. Tried in order;
/// first hit wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d.%m.%Y",
];

/// Tolerant date parsing. Accepts any format in `DATE_FORMATS`, with or
/// without a trailing time-of-day component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean_cell(raw);
    if cleaned.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d);
        }
    }
    // "2000-05-20 00:00:00" and friends: retry on the date part alone
    if let Some(first) = cleaned.split_whitespace().next() {
        if first != cleaned {
            for fmt in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(first, fmt) {
                    return Some(d);
                }
            }
        }
    }
    None
}

/// Parse a settlement amount. Grouping commas, currency markers and
/// surrounding whitespace are noise, not errors.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = clean_cell(raw)
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Coerce one cell according to its column class. `None` marks a cell that
/// was absent in the source (a null, a short row); the literal sentinel
/// text is folded back into the sentinel so snapshots round-trip.
fn coerce_cell(raw: Option<&str>, header: &str, config: &StoreConfig) -> FieldValue {
    let raw = match raw {
        Some(r) => r,
        None => return FieldValue::NotAvailable,
    };
    let cleaned = clean_cell(raw);
    if cleaned == NOT_AVAILABLE {
        return FieldValue::NotAvailable;
    }

    if config.is_date_column(header) {
        return match parse_date(&cleaned) {
            Some(d) => FieldValue::Date(d),
            None => FieldValue::NotAvailable,
        };
    }
    if config.is_amount_column(header) {
        return match parse_amount(&cleaned) {
            Some(n) => FieldValue::Number(n),
            None => FieldValue::NotAvailable,
        };
    }
    // free-form columns keep a present-but-empty string as-is
    FieldValue::Text(cleaned)
}

/// Coerce a whole string table into typed rows. Short rows are padded with
/// the sentinel; per-cell parse failures recover locally and never abort
/// the load.
pub fn coerce_rows(
    headers: &[String],
    raw_rows: Vec<Vec<Option<String>>>,
    config: &StoreConfig,
) -> Vec<Vec<FieldValue>> {
    raw_rows
        .into_iter()
        .map(|raw_row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let cell = raw_row.get(i).and_then(|c| c.as_deref());
                    coerce_cell(cell, header, config)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_formats_are_tolerated() {
        let expected = NaiveDate::from_ymd_opt(2000, 5, 20).unwrap();
        for raw in [
            "2000-05-20",
            "20-05-2000",
            "20/05/2000",
            "2000/05/20",
            "20-May-2000",
            "20 May 2000",
            "20.05.2000",
            "2000-05-20 00:00:00",
            " \"2000-05-20\" ",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed on {:?}", raw);
        }
        assert_eq!(parse_date("2000-13-20"), None);
        assert_eq!(parse_date("soonish"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn amounts_tolerate_currency_noise() {
        assert_eq!(parse_amount("₹45,678.00"), Some(45678.0));
        assert_eq!(parse_amount(" 0 "), Some(0.0));
        assert_eq!(parse_amount("$1,234.5"), Some(1234.5));
        assert_eq!(parse_amount("pending"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn cells_coerce_by_column_class() {
        let cfg = StoreConfig::default();
        let headers: Vec<String> = ["Employee ID", "DOB", "FFS", "Remarks"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec![
                Some("010123456".to_string()),
                Some("2000-05-20".to_string()),
                Some("0".to_string()),
                Some("".to_string()),
            ],
            // short row: the missing trailing cells become the sentinel
            vec![Some("7".to_string()), Some("not a date".to_string())],
        ];
        let typed = coerce_rows(&headers, rows, &cfg);

        assert_eq!(typed[0][0], FieldValue::Text("010123456".to_string()));
        assert_eq!(
            typed[0][1],
            FieldValue::Date(NaiveDate::from_ymd_opt(2000, 5, 20).unwrap())
        );
        assert_eq!(typed[0][2], FieldValue::Number(0.0));
        // present-but-empty free-form cell stays an empty string
        assert_eq!(typed[0][3], FieldValue::Text(String::new()));

        assert_eq!(typed[1][1], FieldValue::NotAvailable);
        assert_eq!(typed[1][2], FieldValue::NotAvailable);
        assert_eq!(typed[1][3], FieldValue::NotAvailable);
    }

    #[test]
    fn sentinel_literal_folds_back() {
        let cfg = StoreConfig::default();
        let headers = vec!["Employee ID".to_string(), "Remarks".to_string()];
        let rows = vec![vec![
            Some("7".to_string()),
            Some("Not Available".to_string()),
        ]];
        let typed = coerce_rows(&headers, rows, &cfg);
        assert_eq!(typed[0][1], FieldValue::NotAvailable);
    }
}
