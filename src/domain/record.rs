//! Raw catalog rows and value normalization
//!
//! Input files are column-name driven: a row is a bag of header-keyed cell
//! values, and every consumer goes through the cleanup helpers here before
//! trusting a cell.

use std::collections::HashMap;

use tracing::warn;

/// One row of an input file, keyed by (trimmed) column header.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based line number in the source file, for duplicate reports.
    pub line: usize,
    values: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Raw cell value, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Cleaned cell value; missing columns collapse to the empty string.
    pub fn value(&self, column: &str) -> String {
        clean_value(self.get(column).unwrap_or_default())
    }

    /// Column names present on this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Builder-style constructor used heavily by tests.
impl<const N: usize> From<[(&str, &str); N]> for RawRow {
    fn from(cells: [(&str, &str); N]) -> Self {
        let mut row = RawRow::new(0);
        for (column, value) in cells {
            row.insert(column, value);
        }
        row
    }
}

/// Clean a raw cell value: `None`-ish markers and whitespace-only content
/// collapse to the empty string, everything else is trimmed.
pub fn clean_value(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed {
        "" | "nan" | "NaN" | "NULL" | "null" | "None" => String::new(),
        _ => trimmed.to_string(),
    }
}

/// Parse a price cell into a float.
///
/// Strips currency symbols and other non-numeric noise, accepts a decimal
/// comma, and falls back to 0.0 (with a warning) on garbage.
pub fn parse_price(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalized = cleaned.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(price) => price,
        Err(_) => {
            warn!("could not parse price value '{value}', defaulting to 0.0");
            0.0
        }
    }
}

/// Parse a stock cell into a unit count; anything unparsable counts as 0.
pub fn parse_stock(value: &str) -> i64 {
    let cleaned = clean_value(value);
    cleaned
        .parse::<i64>()
        .or_else(|_| cleaned.parse::<f64>().map(|f| f as i64))
        .unwrap_or(0)
}

/// Weight cells arrive as grams with an optional decimal part.
pub fn parse_grams(value: &str) -> i64 {
    let cleaned = clean_value(value);
    if cleaned.is_empty() {
        return 0;
    }
    parse_price(&cleaned) as i64
}

/// Normalize an identifier for lookups: all-digit references are zero-padded
/// to four characters so `12` and `0012` resolve to the same mapping.
pub fn normalize_reference(reference: &str) -> String {
    let trimmed = reference.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("{trimmed:0>4}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_value_collapses_null_markers() {
        assert_eq!(clean_value("  hello "), "hello");
        assert_eq!(clean_value("nan"), "");
        assert_eq!(clean_value("NaN"), "");
        assert_eq!(clean_value("NULL"), "");
        assert_eq!(clean_value("   "), "");
    }

    #[test]
    fn parse_price_accepts_decimal_comma_and_noise() {
        assert_eq!(parse_price("12,50"), 12.5);
        assert_eq!(parse_price("1299.99"), 1299.99);
        assert_eq!(parse_price("EUR 45,00"), 45.0);
        assert_eq!(parse_price("not a price"), 0.0);
    }

    #[test]
    fn parse_stock_defaults_to_zero() {
        assert_eq!(parse_stock("7"), 7);
        assert_eq!(parse_stock("3.0"), 3);
        assert_eq!(parse_stock(""), 0);
        assert_eq!(parse_stock("n/a"), 0);
    }

    #[test]
    fn normalize_reference_pads_numeric_ids() {
        assert_eq!(normalize_reference("12"), "0012");
        assert_eq!(normalize_reference("12345"), "12345");
        assert_eq!(normalize_reference("AB12"), "AB12");
        assert_eq!(normalize_reference(" 7 "), "0007");
    }

    #[test]
    fn row_value_cleans_missing_columns() {
        let row = RawRow::from([("REFERENCIA", " ABC/S "), ("STOCK", "nan")]);
        assert_eq!(row.value("REFERENCIA"), "ABC/S");
        assert_eq!(row.value("STOCK"), "");
        assert_eq!(row.value("MISSING"), "");
    }
}
