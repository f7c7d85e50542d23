//! Sync orchestration: the create flow from a supplier catalog file.
//!
//! Records are processed strictly sequentially, one at a time. Failures are
//! per-record: the batch always completes and reports an end-of-run tally.
//! There is no retry and no transactional rollback across remote calls and
//! local store writes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::preparation::{
    PreparedProduct, PreparedVariant, distinct_sizes, prepare_product, prepare_variants,
};
use crate::application::validation::{ValidationError, validate_product_row};
use crate::domain::catalog::{CatalogApi, NewProduct, NewVariant, ProductOption, RemoteProduct};
use crate::domain::record::RawRow;
use crate::domain::reference::{ProductGroup, REFERENCE_COLUMN, group_rows};
use crate::infrastructure::mapping_repository::MappingRepository;

/// Per-record failure taxonomy: what went wrong decides only how the failure
/// is reported, never whether the batch continues.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("remote call failed: {0}")]
    Remote(anyhow::Error),
    #[error("mapping store write failed: {0}")]
    Store(anyhow::Error),
}

/// Knobs for a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub vendor: String,
    pub price_multiplier: f64,
    /// Pause between consecutive remote mutations (rate-limit avoidance).
    pub request_delay: Duration,
}

/// End-of-run tally.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn log(&self) {
        info!("========================================");
        info!("PROCESSING SUMMARY");
        info!("========================================");
        info!("Total products handled: {}", self.processed + self.failed);
        info!("Successful: {}", self.processed);
        info!("Failed: {}", self.failed);
        info!("Total time: {:.2}s", self.elapsed.as_secs_f64());
        if self.processed > 0 {
            info!(
                "Average per product: {:.2}s",
                self.elapsed.as_secs_f64() / self.processed as f64
            );
        }
        info!("========================================");
    }
}

/// Drives the create flow: group, validate, create remotely, persist
/// mappings, set inventory, attach metafields and images.
pub struct SyncOrchestrator {
    api: Arc<dyn CatalogApi>,
    store: MappingRepository,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(api: Arc<dyn CatalogApi>, store: MappingRepository, settings: SyncSettings) -> Self {
        Self { api, store, settings }
    }

    /// Process the given rows. In preview mode the records are grouped,
    /// validated and reported, but nothing is mutated remotely or locally.
    pub async fn run(&self, rows: &[RawRow], preview: bool) -> Result<SyncReport> {
        let started = Instant::now();
        let mut processed = 0usize;
        let mut failed = 0usize;

        // Preview never touches the API; the location lookup only happens live.
        let location_id = if preview {
            0
        } else {
            self.api.primary_location_id().await?
        };

        // Rows without a reference never form a group; they still fail
        // validation and count toward the tally.
        for row in rows {
            if row.value(REFERENCE_COLUMN).is_empty() {
                if let Err(err) = validate_product_row(row) {
                    error!("row {}: {err}", row.line);
                }
                failed += 1;
            }
        }

        let groups = group_rows(rows);
        let total = groups.len();
        info!("Products to process: {total}");

        for (position, group) in groups.iter().enumerate() {
            info!(
                "[{}/{}] Processing: {}",
                position + 1,
                total,
                group.base_reference
            );

            let outcome = if preview {
                self.preview_group(group)
            } else {
                self.process_group(group, location_id).await
            };
            match outcome {
                Ok(true) => processed += 1,
                Ok(false) => {} // preview: nothing counted
                Err(err) => {
                    error!("{}: {err}", group.base_reference);
                    failed += 1;
                }
            }

            if !preview && position + 1 < total {
                tokio::time::sleep(self.settings.request_delay).await;
            }
        }

        let report = SyncReport {
            total,
            processed,
            failed,
            elapsed: started.elapsed(),
        };
        report.log();
        Ok(report)
    }

    fn preview_group(&self, group: &ProductGroup) -> Result<bool, RecordError> {
        validate_product_row(&group.base_data)?;
        let product = prepare_product(group, self.settings.price_multiplier);

        let kind = if group.is_variant_product {
            format!("variant product ({} rows)", group.variants.len())
        } else {
            "simple product".to_string()
        };
        info!(
            "  would create {kind}: '{}' at {:.2} with tags [{}]",
            product.title, product.price, product.tags
        );
        Ok(false)
    }

    async fn process_group(
        &self,
        group: &ProductGroup,
        location_id: i64,
    ) -> Result<bool, RecordError> {
        validate_product_row(&group.base_data)?;
        let product = prepare_product(group, self.settings.price_multiplier);

        if group.is_variant_product {
            let variants = prepare_variants(&group.variants, self.settings.price_multiplier);
            self.create_variant_product(&product, &variants, location_id)
                .await?;
        } else {
            self.create_simple_product(&product, location_id).await?;
        }
        Ok(true)
    }

    async fn create_simple_product(
        &self,
        product: &PreparedProduct,
        location_id: i64,
    ) -> Result<(), RecordError> {
        let payload = NewProduct {
            title: product.title.clone(),
            body_html: product.body_html.clone(),
            vendor: self.settings.vendor.clone(),
            product_type: product.product_type.clone(),
            tags: product.tags.clone(),
            published: true,
            options: None,
            variants: vec![new_variant(None, product.price, &product.sku, product.grams, product.cost)],
        };

        let created = self
            .api
            .create_product(&payload)
            .await
            .map_err(RecordError::Remote)?;

        self.store
            .save_product_mapping(&product.sku, &created)
            .await
            .map_err(RecordError::Store)?;

        if let Some(variant) = created.variants.first() {
            if let Err(err) = self
                .api
                .set_inventory_level(location_id, variant.inventory_item_id, product.stock)
                .await
            {
                warn!("inventory for {} failed: {err}", product.sku);
            }
        }

        self.finish_product(&created, product).await;
        info!("Simple product created: {}", product.sku);
        Ok(())
    }

    async fn create_variant_product(
        &self,
        product: &PreparedProduct,
        variants: &[PreparedVariant],
        location_id: i64,
    ) -> Result<(), RecordError> {
        let payload = NewProduct {
            title: product.title.clone(),
            body_html: product.body_html.clone(),
            vendor: self.settings.vendor.clone(),
            product_type: product.product_type.clone(),
            tags: product.tags.clone(),
            published: true,
            options: Some(vec![ProductOption {
                name: "Talla".to_string(),
                values: distinct_sizes(variants),
            }]),
            variants: variants
                .iter()
                .map(|v| new_variant(Some(v.size.clone()), v.price, &v.sku, v.grams, v.cost))
                .collect(),
        };

        let created = self
            .api
            .create_product(&payload)
            .await
            .map_err(RecordError::Remote)?;

        self.store
            .save_product_mapping(&product.sku, &created)
            .await
            .map_err(RecordError::Store)?;

        // Remote variants come back in payload order.
        for (remote, prepared) in created.variants.iter().zip(variants) {
            self.store
                .save_variant_mapping(
                    &prepared.sku,
                    remote,
                    &product.sku,
                    Some(&prepared.size),
                    Some(prepared.price),
                )
                .await
                .map_err(RecordError::Store)?;

            if let Err(err) = self
                .api
                .set_inventory_level(location_id, remote.inventory_item_id, prepared.stock)
                .await
            {
                warn!("inventory for {} failed: {err}", prepared.sku);
            }
        }

        self.finish_product(&created, product).await;
        info!(
            "Variant product created: {} ({} sizes)",
            product.sku,
            variants.len()
        );
        Ok(())
    }

    /// Metafields and images are best-effort: individual failures are logged
    /// and never fail the record.
    async fn finish_product(&self, created: &RemoteProduct, product: &PreparedProduct) {
        for metafield in &product.metafields {
            if let Err(err) = self.api.create_metafield(created.id, metafield).await {
                warn!("metafield '{}' for {} failed: {err}", metafield.key, product.sku);
            }
        }
        for image in &product.images {
            if let Err(err) = self.api.add_image(created.id, image).await {
                warn!("image {} for {} failed: {err}", image.position, product.sku);
            }
        }
    }
}

fn new_variant(size: Option<String>, price: f64, sku: &str, grams: i64, cost: f64) -> NewVariant {
    NewVariant {
        option1: size,
        price: format!("{price:.2}"),
        sku: sku.to_string(),
        inventory_management: "shopify".to_string(),
        inventory_policy: "deny".to_string(),
        grams,
        cost: Some(format!("{cost:.2}")),
    }
}
