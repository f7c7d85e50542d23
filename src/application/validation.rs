//! Required-field validation for catalog rows.
//!
//! Validation failures are ordinary values, not I/O errors: a record that
//! fails here is skipped and reported, never retried, and never aborts the
//! batch.

use thiserror::Error;

use crate::domain::record::RawRow;

/// Column name plus the human-readable field name used in reports.
pub const REQUIRED_FIELDS: [(&str, &str); 4] = [
    ("REFERENCIA", "referencia"),
    ("DESCRIPCION", "descripción"),
    ("PRECIO", "precio"),
    ("TIPO", "tipo"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

/// Check that a product row carries every required field with a non-empty
/// value after cleanup.
pub fn validate_product_row(row: &RawRow) -> Result<(), ValidationError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(column, _)| row.value(column).is_empty())
        .map(|(_, name)| (*name).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_row_passes() {
        let row = RawRow::from([
            ("REFERENCIA", "ABC"),
            ("DESCRIPCION", "18K gold ring"),
            ("PRECIO", "120.0"),
            ("TIPO", "anillo"),
        ]);
        assert!(validate_product_row(&row).is_ok());
    }

    #[test]
    fn missing_and_blank_fields_are_reported() {
        let row = RawRow::from([("REFERENCIA", "ABC"), ("PRECIO", "  ")]);
        let err = validate_product_row(&row).unwrap_err();
        assert_eq!(err.missing, vec!["descripción", "precio", "tipo"]);
    }

    #[test]
    fn nan_counts_as_missing() {
        let row = RawRow::from([
            ("REFERENCIA", "ABC"),
            ("DESCRIPCION", "nan"),
            ("PRECIO", "10"),
            ("TIPO", "anillo"),
        ]);
        let err = validate_product_row(&row).unwrap_err();
        assert_eq!(err.missing, vec!["descripción"]);
    }
}
