//! CSV input loading
//!
//! Source files arrive with unpredictable encodings and separators, so the
//! loader decodes UTF-8 with a latin1 fallback and probes `,`, `;` and tab
//! until the header splits into more than one column. Headers are trimmed;
//! rows come back keyed by header name.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::domain::record::RawRow;

const SEPARATORS: [u8; 3] = [b',', b';', b'\t'];

/// Decode file bytes: UTF-8 when valid, otherwise latin1 (every byte maps
/// directly to the code point of the same value).
fn decode_text(bytes: Vec<u8>) -> (String, &'static str) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, "utf-8"),
        Err(err) => {
            let text = err.into_bytes().iter().map(|&b| b as char).collect();
            (text, "latin1")
        }
    }
}

fn parse_with_separator(text: &str, separator: u8) -> Result<Option<Vec<RawRow>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.len() <= 1 {
        return Ok(None);
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to parse CSV record {}", index + 1))?;
        // Header line is line 1; data starts at 2.
        let mut row = RawRow::new(index + 2);
        for (column, value) in headers.iter().zip(record.iter()) {
            row.insert(column.clone(), value);
        }
        rows.push(row);
    }
    Ok(Some(rows))
}

/// Load up to `limit` rows from a CSV file.
pub async fn load_rows(path: &Path, limit: usize) -> Result<Vec<RawRow>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    let (text, encoding) = decode_text(bytes);

    for separator in SEPARATORS {
        if let Some(mut rows) = parse_with_separator(&text, separator)? {
            info!(
                "loaded {} as CSV (encoding: {encoding}, separator: {:?})",
                path.display(),
                separator as char
            );
            rows.truncate(limit);
            return Ok(rows);
        }
    }

    bail!(
        "could not load {} as CSV with any supported separator",
        path.display()
    )
}
