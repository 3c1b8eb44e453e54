use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{StoreConfig, ID_COLUMN};

/// Accepted shape of a queried employee id. Source systems emit plain digit
/// strings ("010123456") and prefixed forms ("EMP1234"); whitespace inside
/// an id is always a caller mistake.
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// Trim a header cell. Column names keep their case.
pub fn clean_header(raw: &str) -> String {
    raw.trim().to_string()
}

/// Trim a data cell and strip one pair of outer quotes if present.
pub fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Locate the employee-identifier column: configured aliases first
/// (case-insensitive exact match), then the heuristic fallback of any
/// header containing both "employee" and "id".
pub fn find_id_column(headers: &[String], config: &StoreConfig) -> Option<usize> {
    for alias in &config.id_aliases {
        if let Some(idx) = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(alias))
        {
            return Some(idx);
        }
    }
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        lower.contains("employee") && lower.contains("id")
    })
}

/// Trim all headers and rename the detected key column to the canonical
/// `Employee ID`. Returns `None` when no key column can be found.
pub fn normalize_headers(raw_headers: &[String], config: &StoreConfig) -> Option<Vec<String>> {
    let mut headers: Vec<String> = raw_headers.iter().map(|h| clean_header(h)).collect();
    let key = find_id_column(&headers, config)?;
    headers[key] = ID_COLUMN.to_string();
    Some(headers)
}

pub fn is_valid_id(raw: &str) -> bool {
    ID_PATTERN.is_match(raw)
}

/// Query-time candidate set for one (already trimmed) id: the raw value,
/// plus its zero-padded variant when not zero-prefixed, or the variant with
/// one leading zero removed when zero-prefixed. Stored keys themselves are
/// never rewritten.
pub fn id_candidates(raw: &str) -> Vec<String> {
    let mut candidates = vec![raw.to_string()];
    if let Some(stripped) = raw.strip_prefix('0') {
        if !stripped.is_empty() {
            candidates.push(stripped.to_string());
        }
    } else {
        candidates.push(format!("0{}", raw));
    }
    candidates
}
