//! Mapping entities: persisted correlation between internal references and
//! Shopify identifiers, plus the append-only sync log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correlation between an internal product reference and a Shopify product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMapping {
    pub id: i64,
    pub internal_reference: String,
    pub shopify_product_id: i64,
    pub shopify_handle: Option<String>,
    pub title: Option<String>,
    pub first_created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// Correlation between an internal SKU and a Shopify variant. Owned by its
/// parent product mapping; deleted when the parent is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantMapping {
    pub id: i64,
    pub internal_sku: String,
    pub shopify_variant_id: i64,
    pub shopify_product_id: i64,
    pub parent_reference: String,
    pub size: Option<String>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// A product mapping together with all of its child variant mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedProduct {
    pub product: ProductMapping,
    pub variants: Vec<VariantMapping>,
}

/// One row of the append-only sync audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub internal_reference: String,
    pub action: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Mutation kinds recorded in the sync log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    CreateProduct,
    CreateVariant,
    UpdateProduct,
    DeleteProduct,
}

impl SyncAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateProduct => "create_product",
            Self::CreateVariant => "create_variant",
            Self::UpdateProduct => "update_product",
            Self::DeleteProduct => "delete_product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    Error,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}
