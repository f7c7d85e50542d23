//! Update orchestration: pushing field changes from a platform-export CSV
//! onto products that were created by an earlier sync run.
//!
//! Rows are keyed by `Variant SKU`; the mapping store resolves each SKU to
//! its remote product id. Duplicate SKUs are reported and skipped beyond the
//! first occurrence, never merged.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::application::preparation::{metafield_type, sanitize_image_src};
use crate::domain::catalog::{CatalogApi, NewImage, NewMetafield, ProductUpdate};
use crate::domain::mapping::{SyncAction, SyncStatus};
use crate::domain::record::RawRow;
use crate::domain::reference::{DuplicateRow, ReferenceInfo, analyze_references};
use crate::infrastructure::mapping_repository::MappingRepository;

const SKU_COLUMN: &str = "Variant SKU";
const METAFIELD_COLUMN_PREFIX: &str = "product.metafields.custom.";

/// End-of-run tally for an update batch.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub unique_references: usize,
    pub duplicates: usize,
    pub updated: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl UpdateReport {
    pub fn log(&self) {
        info!("========================================");
        info!("UPDATE SUMMARY");
        info!("========================================");
        info!("Unique references: {}", self.unique_references);
        info!("Duplicate rows ignored: {}", self.duplicates);
        info!("Successful updates: {}", self.updated);
        info!("Failed: {}", self.failed);
        info!("Total time: {:.2}s", self.elapsed.as_secs_f64());
        info!("========================================");
    }
}

/// Changes extracted from one export row.
#[derive(Debug, Clone)]
struct ProductChanges {
    title: String,
    body_html: String,
    tags: BTreeSet<String>,
    images: Vec<NewImage>,
    metafields: Vec<NewMetafield>,
}

pub struct UpdateOrchestrator {
    api: Arc<dyn CatalogApi>,
    store: MappingRepository,
    request_delay: Duration,
}

impl UpdateOrchestrator {
    pub fn new(api: Arc<dyn CatalogApi>, store: MappingRepository, request_delay: Duration) -> Self {
        Self { api, store, request_delay }
    }

    /// Process the given export rows. Preview mode reports the planned
    /// changes without mutating anything.
    pub async fn run(&self, rows: &[RawRow], preview: bool) -> Result<UpdateReport> {
        let started = Instant::now();
        let (references, duplicates) = analyze_references(rows, SKU_COLUMN);
        report_duplicates(&references, &duplicates);

        let mut updated = 0usize;
        let mut failed = 0usize;

        for (position, info) in references.iter().enumerate() {
            match self.update_reference(info, preview).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(err) => {
                    error!("{}: {err}", info.reference);
                    failed += 1;
                }
            }

            if !preview && position + 1 < references.len() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let report = UpdateReport {
            unique_references: references.len(),
            duplicates: duplicates.len(),
            updated,
            failed,
            elapsed: started.elapsed(),
        };
        report.log();
        Ok(report)
    }

    async fn update_reference(&self, info: &ReferenceInfo, preview: bool) -> Result<bool> {
        let reference = &info.reference;
        let changes = extract_changes(&info.first_occurrence);

        let Some(mapping) = self.store.get_product_mapping(reference).await? else {
            anyhow::bail!("no mapping found for reference {reference}");
        };
        let product_id = mapping.product.shopify_product_id;

        let current = self.api.get_product(product_id).await?;

        if preview {
            let existing = self.api.product_metafields(product_id).await?;
            info!("  {} (product {})", reference, product_id);
            if current.title != changes.title {
                info!("    title: '{}' -> '{}'", current.title, changes.title);
            }
            let current_tags = normalize_tags(&current.tags);
            if current_tags != changes.tags {
                info!(
                    "    tags: [{}] -> [{}]",
                    join_tags(&current_tags),
                    join_tags(&changes.tags)
                );
            }
            info!(
                "    {} image(s), {} metafield(s) would be pushed ({} currently set)",
                changes.images.len(),
                changes.metafields.len(),
                existing.len()
            );
            return Ok(false);
        }

        let update = ProductUpdate {
            id: product_id,
            title: changes.title.clone(),
            body_html: changes.body_html.clone(),
            tags: join_tags(&changes.tags),
            images: changes.images.clone(),
            metafields: changes.metafields.clone(),
        };

        match self.api.update_product(&update).await {
            Ok(_) => {
                self.store
                    .log_sync(
                        reference,
                        SyncAction::UpdateProduct,
                        SyncStatus::Success,
                        &format!("Product updated successfully. Title: {}", changes.title),
                    )
                    .await;
                info!("Product updated: {reference}");
                Ok(true)
            }
            Err(err) => {
                self.store
                    .log_sync(
                        reference,
                        SyncAction::UpdateProduct,
                        SyncStatus::Error,
                        &err.to_string(),
                    )
                    .await;
                Err(err)
            }
        }
    }
}

fn report_duplicates(references: &[ReferenceInfo], duplicates: &[DuplicateRow]) {
    info!("Unique references found: {}", references.len());
    if duplicates.is_empty() {
        return;
    }
    warn!(
        "{} duplicate row(s) will be ignored (first occurrence wins):",
        duplicates.len()
    );
    for info in references.iter().filter(|i| i.count > 1) {
        warn!(
            "  {} appears on file lines {}",
            info.reference,
            info.row_numbers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

fn clean_tag(tag: &str) -> String {
    tag.trim().replace("  ", " ")
}

fn normalize_tags(tags: &str) -> BTreeSet<String> {
    tags.split(',')
        .map(clean_tag)
        .filter(|t| !t.is_empty())
        .collect()
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn extract_changes(row: &RawRow) -> ProductChanges {
    let title = row.value("Title");

    let mut images = Vec::new();
    for position in 1..=3 {
        let raw = row.value(&format!("Image Src {position}"));
        if let Some(src) = sanitize_image_src(&raw) {
            images.push(NewImage {
                src,
                position,
                alt: format!("{title} - Imagen {position}"),
            });
        }
    }

    let mut metafields = Vec::new();
    let mut metafield_columns: Vec<String> = row
        .columns()
        .filter(|c| c.starts_with(METAFIELD_COLUMN_PREFIX))
        .map(str::to_string)
        .collect();
    metafield_columns.sort();
    for column in metafield_columns {
        let value = row.value(&column);
        if value.is_empty() {
            continue;
        }
        let key = column.trim_start_matches(METAFIELD_COLUMN_PREFIX);
        let (value_type, formatted) = metafield_type(key, &value);
        metafields.push(NewMetafield::new(key, formatted, value_type));
    }

    ProductChanges {
        title,
        body_html: row.value("Body (HTML)"),
        tags: normalize_tags(&row.value("Tags")),
        images,
        metafields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_normalize_to_clean_set() {
        let tags = normalize_tags("Anillos , Oro,  ,Solitarios");
        assert_eq!(join_tags(&tags), "Anillos, Oro, Solitarios");
    }

    #[test]
    fn changes_extract_metafields_and_images() {
        let row = RawRow::from([
            ("Variant SKU", "ABC"),
            ("Title", "ABC - Anillo"),
            ("Body (HTML)", "<p>Anillo</p>"),
            ("Tags", "Oro, Anillos"),
            ("Image Src 1", "cdn.example.com/1.jpg"),
            ("product.metafields.custom.alto", "1,5"),
            ("product.metafields.custom.cierre", "NULL"),
            ("product.metafields.custom.material", "Oro 18 kilates"),
        ]);

        let changes = extract_changes(&row);
        assert_eq!(changes.title, "ABC - Anillo");
        assert_eq!(changes.images.len(), 1);
        assert_eq!(changes.images[0].src, "https://cdn.example.com/1.jpg");
        assert_eq!(changes.metafields.len(), 2);
        let alto = changes.metafields.iter().find(|m| m.key == "alto").unwrap();
        assert_eq!(alto.value, "1.5");
        assert_eq!(alto.value_type, "number_decimal");
    }
}
