//! Mapping Store: persisted correlation between internal references/SKUs and
//! Shopify identifiers, with an append-only sync history.
//!
//! Every mutating call appends a sync_log row describing its outcome. A
//! failure to write the log itself is only logged and never aborts the
//! caller's primary operation.

use std::sync::Arc;

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::error;

use crate::domain::catalog::{RemoteProduct, RemoteVariant};
use crate::domain::mapping::{
    MappedProduct, ProductMapping, SyncAction, SyncLogEntry, SyncStatus, VariantMapping,
};

#[derive(Clone)]
pub struct MappingRepository {
    pool: Arc<SqlitePool>,
}

impl MappingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Insert or update the mapping for a product. Idempotent by
    /// `internal_reference`.
    pub async fn save_product_mapping(
        &self,
        internal_reference: &str,
        product: &RemoteProduct,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_mappings
            (internal_reference, shopify_product_id, shopify_handle, title)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(internal_reference) DO UPDATE SET
                shopify_product_id = excluded.shopify_product_id,
                shopify_handle = excluded.shopify_handle,
                title = excluded.title,
                last_updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(internal_reference)
        .bind(product.id)
        .bind(&product.handle)
        .bind(&product.title)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => {
                self.log_sync(
                    internal_reference,
                    SyncAction::CreateProduct,
                    SyncStatus::Success,
                    &format!("Product mapped successfully. Shopify ID: {}", product.id),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                self.log_sync(
                    internal_reference,
                    SyncAction::CreateProduct,
                    SyncStatus::Error,
                    &err.to_string(),
                )
                .await;
                Err(err.into())
            }
        }
    }

    /// Insert or update the mapping for a variant. Idempotent by
    /// `internal_sku`. The parent product mapping must already exist.
    pub async fn save_variant_mapping(
        &self,
        internal_sku: &str,
        variant: &RemoteVariant,
        parent_reference: &str,
        size: Option<&str>,
        price: Option<f64>,
    ) -> Result<()> {
        let price = price.or_else(|| variant.price.as_deref().and_then(|p| p.parse().ok()));
        let result = sqlx::query(
            r#"
            INSERT INTO variant_mappings
            (internal_sku, shopify_variant_id, shopify_product_id, parent_reference, size, price)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(internal_sku) DO UPDATE SET
                shopify_variant_id = excluded.shopify_variant_id,
                shopify_product_id = excluded.shopify_product_id,
                size = excluded.size,
                price = excluded.price,
                last_updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(internal_sku)
        .bind(variant.id)
        .bind(variant.product_id)
        .bind(parent_reference)
        .bind(size)
        .bind(price)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => {
                self.log_sync(
                    internal_sku,
                    SyncAction::CreateVariant,
                    SyncStatus::Success,
                    &format!("Variant mapped successfully. Shopify ID: {}", variant.id),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                self.log_sync(
                    internal_sku,
                    SyncAction::CreateVariant,
                    SyncStatus::Error,
                    &err.to_string(),
                )
                .await;
                Err(err.into())
            }
        }
    }

    /// The mapping for a product together with all of its child variants.
    pub async fn get_product_mapping(
        &self,
        internal_reference: &str,
    ) -> Result<Option<MappedProduct>> {
        let row = sqlx::query(
            "SELECT * FROM product_mappings WHERE internal_reference = ?",
        )
        .bind(internal_reference)
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let product = product_from_row(&row)?;

        let variant_rows = sqlx::query(
            "SELECT * FROM variant_mappings WHERE parent_reference = ? ORDER BY internal_sku",
        )
        .bind(internal_reference)
        .fetch_all(&*self.pool)
        .await?;

        let variants = variant_rows
            .iter()
            .map(variant_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(MappedProduct { product, variants }))
    }

    pub async fn get_variant_mapping(&self, internal_sku: &str) -> Result<Option<VariantMapping>> {
        let row = sqlx::query("SELECT * FROM variant_mappings WHERE internal_sku = ?")
            .bind(internal_sku)
            .fetch_optional(&*self.pool)
            .await?;

        row.as_ref().map(variant_from_row).transpose()
    }

    /// Delete a product mapping; child variant mappings go with it via the
    /// foreign-key cascade.
    pub async fn delete_product_mapping(&self, internal_reference: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM product_mappings WHERE internal_reference = ?")
            .bind(internal_reference)
            .execute(&*self.pool)
            .await;

        match result {
            Ok(_) => {
                self.log_sync(
                    internal_reference,
                    SyncAction::DeleteProduct,
                    SyncStatus::Success,
                    "Product mapping deleted successfully",
                )
                .await;
                Ok(())
            }
            Err(err) => {
                self.log_sync(
                    internal_reference,
                    SyncAction::DeleteProduct,
                    SyncStatus::Error,
                    &err.to_string(),
                )
                .await;
                Err(err.into())
            }
        }
    }

    /// Append a sync history row. Failures are swallowed by design: the audit
    /// trail must never take the primary operation down with it.
    pub async fn log_sync(
        &self,
        internal_reference: &str,
        action: SyncAction,
        status: SyncStatus,
        message: &str,
    ) {
        let result = sqlx::query(
            "INSERT INTO sync_log (internal_reference, action, status, message) VALUES (?, ?, ?, ?)",
        )
        .bind(internal_reference)
        .bind(action.as_str())
        .bind(status.as_str())
        .bind(message)
        .execute(&*self.pool)
        .await;

        if let Err(err) = result {
            error!("failed to append sync log for {internal_reference}: {err}");
        }
    }

    /// Sync history for a reference, newest first.
    pub async fn get_sync_history(
        &self,
        internal_reference: &str,
        limit: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sync_log
            WHERE internal_reference = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(internal_reference)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SyncLogEntry {
                    id: row.try_get("id")?,
                    internal_reference: row.try_get("internal_reference")?,
                    action: row.try_get("action")?,
                    status: row.try_get("status")?,
                    message: row.try_get("message")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProductMapping> {
    Ok(ProductMapping {
        id: row.try_get("id")?,
        internal_reference: row.try_get("internal_reference")?,
        shopify_product_id: row.try_get("shopify_product_id")?,
        shopify_handle: row.try_get("shopify_handle")?,
        title: row.try_get("title")?,
        first_created_at: row.try_get("first_created_at")?,
        last_updated_at: row.try_get("last_updated_at")?,
    })
}

fn variant_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<VariantMapping> {
    Ok(VariantMapping {
        id: row.try_get("id")?,
        internal_sku: row.try_get("internal_sku")?,
        shopify_variant_id: row.try_get("shopify_variant_id")?,
        shopify_product_id: row.try_get("shopify_product_id")?,
        parent_reference: row.try_get("parent_reference")?,
        size: row.try_get("size")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
        last_updated_at: row.try_get("last_updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use tempfile::tempdir;

    fn remote_product(id: i64, handle: &str) -> RemoteProduct {
        RemoteProduct {
            id,
            handle: handle.to_string(),
            title: format!("Product {handle}"),
            body_html: None,
            tags: String::new(),
            variants: Vec::new(),
            images: Vec::new(),
        }
    }

    fn remote_variant(id: i64, product_id: i64) -> RemoteVariant {
        RemoteVariant {
            id,
            product_id,
            sku: None,
            price: Some("25.00".to_string()),
            option1: Some("S".to_string()),
            inventory_item_id: id * 10,
        }
    }

    async fn test_repository(dir: &tempfile::TempDir) -> MappingRepository {
        let db_path = dir.path().join("mappings.db");
        let url = format!("sqlite:{}", db_path.display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        db.migrate().await.unwrap();
        MappingRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        let product = remote_product(1, "abc");
        repo.save_product_mapping("ABC", &product).await.unwrap();
        repo.save_product_mapping("ABC", &product).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_mappings")
            .fetch_one(&*repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_remote_id() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        repo.save_product_mapping("ABC", &remote_product(1, "abc"))
            .await
            .unwrap();
        repo.save_product_mapping("ABC", &remote_product(2, "abc-2"))
            .await
            .unwrap();

        let mapping = repo.get_product_mapping("ABC").await.unwrap().unwrap();
        assert_eq!(mapping.product.shopify_product_id, 2);
        assert_eq!(mapping.product.shopify_handle.as_deref(), Some("abc-2"));
    }

    #[tokio::test]
    async fn delete_cascades_to_variants() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        repo.save_product_mapping("ABC", &remote_product(1, "abc"))
            .await
            .unwrap();
        repo.save_variant_mapping("ABC/S", &remote_variant(11, 1), "ABC", Some("S"), Some(25.0))
            .await
            .unwrap();
        repo.save_variant_mapping("ABC/M", &remote_variant(12, 1), "ABC", Some("M"), Some(25.0))
            .await
            .unwrap();

        let mapping = repo.get_product_mapping("ABC").await.unwrap().unwrap();
        assert_eq!(mapping.variants.len(), 2);

        repo.delete_product_mapping("ABC").await.unwrap();

        assert!(repo.get_product_mapping("ABC").await.unwrap().is_none());
        assert!(repo.get_variant_mapping("ABC/S").await.unwrap().is_none());
        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM variant_mappings WHERE parent_reference = 'ABC'",
        )
        .fetch_one(&*repo.pool)
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn variant_insert_requires_parent() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        let result = repo
            .save_variant_mapping("ORPHAN/S", &remote_variant(1, 1), "ORPHAN", Some("S"), None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mutations_append_sync_history() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        repo.save_product_mapping("ABC", &remote_product(1, "abc"))
            .await
            .unwrap();
        repo.delete_product_mapping("ABC").await.unwrap();

        let history = repo.get_sync_history("ABC", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first: the delete comes before the create.
        assert_eq!(history[0].action, "delete_product");
        assert_eq!(history[1].action, "create_product");
        assert!(history.iter().all(|entry| entry.status == "success"));
    }

    #[tokio::test]
    async fn failed_variant_insert_logs_error_entry() {
        let dir = tempdir().unwrap();
        let repo = test_repository(&dir).await;

        let _ = repo
            .save_variant_mapping("ORPHAN/S", &remote_variant(1, 1), "ORPHAN", Some("S"), None)
            .await;

        let history = repo.get_sync_history("ORPHAN/S", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "error");
        assert_eq!(history[0].action, "create_variant");
    }
}
