//! Reference resolution and variant grouping
//!
//! A `/`-delimited suffix on a reference marks a size variant: `ABC/S` is the
//! size-S variant of base product `ABC`. Rows sharing a base reference are
//! grouped into one product; the first row seen for a base reference supplies
//! the product-level data.

use std::collections::HashMap;

use crate::domain::record::{RawRow, normalize_reference};

pub const REFERENCE_COLUMN: &str = "REFERENCIA";

/// Whether a reference carries a variant size suffix.
pub fn is_variant_reference(reference: &str) -> bool {
    reference.contains('/')
}

/// Base (parent) reference: the prefix before the first `/`.
pub fn base_reference(reference: &str) -> &str {
    reference.split('/').next().unwrap_or(reference)
}

/// Variant size: the suffix after the first `/`, if any.
pub fn variant_size(reference: &str) -> Option<&str> {
    let mut parts = reference.splitn(2, '/');
    parts.next();
    parts.next()
}

/// Rows grouped under one base reference.
#[derive(Debug, Clone)]
pub struct ProductGroup {
    pub base_reference: String,
    /// First row seen for this base reference; supplies product-level fields.
    pub base_data: RawRow,
    /// Variant rows. For a simple product this holds the single base row.
    pub variants: Vec<RawRow>,
    /// True once any row in the bucket carried a `/` suffix.
    pub is_variant_product: bool,
}

/// Bucket rows by base reference, preserving first-seen order.
///
/// A bucket becomes a variant product as soon as one of its rows has a size
/// suffix; otherwise it stays a simple product represented by its single row.
pub fn group_rows(rows: &[RawRow]) -> Vec<ProductGroup> {
    let mut groups: Vec<ProductGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let reference = row.value(REFERENCE_COLUMN);
        if reference.is_empty() {
            continue;
        }
        let base = base_reference(&reference).to_string();

        let slot = *index.entry(base.clone()).or_insert_with(|| {
            groups.push(ProductGroup {
                base_reference: base.clone(),
                base_data: row.clone(),
                variants: Vec::new(),
                is_variant_product: false,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];

        if is_variant_reference(&reference) {
            group.is_variant_product = true;
            group.variants.push(row.clone());
        } else if group.variants.is_empty() {
            group.variants.push(row.clone());
        }
    }

    groups
}

/// First occurrence of a reference in an update-flow file.
#[derive(Debug, Clone)]
pub struct ReferenceInfo {
    pub reference: String,
    pub first_occurrence: RawRow,
    pub count: usize,
    /// Physical file line of every occurrence (the header is line 1, so data
    /// starts at line 2).
    pub row_numbers: Vec<usize>,
}

/// A row skipped because its reference was already seen.
#[derive(Debug, Clone)]
pub struct DuplicateRow {
    pub reference: String,
    /// Physical file line, same convention as [`ReferenceInfo::row_numbers`].
    pub row_number: usize,
    pub title: String,
}

/// Scan update-flow rows for duplicate references.
///
/// Duplicates are reported, not merged: only the first occurrence of each
/// reference is ever processed. Output is sorted by reference for stable
/// reporting. Occurrences are identified by their physical file line (rows
/// built without one fall back to their 1-based position in the slice).
pub fn analyze_references(
    rows: &[RawRow],
    reference_column: &str,
) -> (Vec<ReferenceInfo>, Vec<DuplicateRow>) {
    let mut infos: Vec<ReferenceInfo> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        let raw = row.value(reference_column);
        if raw.is_empty() {
            continue;
        }
        let reference = normalize_reference(&raw);
        let row_number = if row.line > 0 { row.line } else { position + 1 };

        match index.get(&reference) {
            Some(&slot) => {
                let info = &mut infos[slot];
                info.count += 1;
                info.row_numbers.push(row_number);
                duplicates.push(DuplicateRow {
                    reference: reference.clone(),
                    row_number,
                    title: row.value("Title"),
                });
            }
            None => {
                index.insert(reference.clone(), infos.len());
                infos.push(ReferenceInfo {
                    reference,
                    first_occurrence: row.clone(),
                    count: 1,
                    row_numbers: vec![row_number],
                });
            }
        }
    }

    infos.sort_by(|a, b| a.reference.cmp(&b.reference));
    (infos, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reference: &str) -> RawRow {
        RawRow::from([("REFERENCIA", reference), ("DESCRIPCION", "test item")])
    }

    #[test]
    fn splits_on_first_slash() {
        assert_eq!(base_reference("ABC/S"), "ABC");
        assert_eq!(variant_size("ABC/S"), Some("S"));
        assert_eq!(variant_size("ABC/S/2"), Some("S/2"));
        assert_eq!(base_reference("XYZ"), "XYZ");
        assert_eq!(variant_size("XYZ"), None);
    }

    #[test]
    fn sized_rows_form_one_variant_product() {
        let rows = vec![row("ABC/S"), row("ABC/M")];
        let groups = group_rows(&rows);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.base_reference, "ABC");
        assert!(group.is_variant_product);
        assert_eq!(group.variants.len(), 2);
        let sizes: Vec<String> = group
            .variants
            .iter()
            .map(|r| variant_size(&r.value(REFERENCE_COLUMN)).unwrap().to_string())
            .collect();
        assert_eq!(sizes, vec!["S", "M"]);
    }

    #[test]
    fn bare_row_forms_simple_product() {
        let groups = group_rows(&[row("XYZ")]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].base_reference, "XYZ");
        assert!(!groups[0].is_variant_product);
        assert_eq!(groups[0].variants.len(), 1);
    }

    #[test]
    fn first_row_wins_base_data() {
        let mut first = row("ABC/S");
        first.insert("PRECIO", "10");
        let mut second = row("ABC/M");
        second.insert("PRECIO", "20");

        let groups = group_rows(&[first, second]);
        assert_eq!(groups[0].base_data.value("PRECIO"), "10");
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let rows = vec![row("B"), row("A/S"), row("A/M"), row("C")];
        let groups = group_rows(&rows);
        let order: Vec<&str> = groups.iter().map(|g| g.base_reference.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn duplicate_references_reported_not_merged() {
        // Loader convention: the header is line 1, data starts at 2.
        let mut rows = Vec::new();
        for (line, sku) in [(2, "0012"), (3, "0034"), (4, "12")] {
            let mut r = RawRow::new(line);
            r.insert("Variant SKU", sku);
            r.insert("Title", format!("title {line}"));
            rows.push(r);
        }

        let (infos, duplicates) = analyze_references(&rows, "Variant SKU");
        assert_eq!(infos.len(), 2);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].reference, "0012");
        assert_eq!(duplicates[0].row_number, 4);

        let first = infos.iter().find(|i| i.reference == "0012").unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.row_numbers, vec![2, 4]);
        assert_eq!(first.first_occurrence.value("Title"), "title 2");
    }
}
