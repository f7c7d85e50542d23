//! Remote catalog surface: the payload/value types exchanged with the
//! e-commerce platform and the `CatalogApi` trait the orchestrators call.
//!
//! The trait keeps orchestration testable without a live shop; the production
//! implementation lives in `infrastructure::shopify`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub title: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ProductOption>>,
    pub variants: Vec<NewVariant>,
}

/// A product option (e.g. "Talla") with its sorted distinct values.
#[derive(Debug, Clone, Serialize)]
pub struct ProductOption {
    pub name: String,
    pub values: Vec<String>,
}

/// Payload for one variant of a new product.
#[derive(Debug, Clone, Serialize)]
pub struct NewVariant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option1: Option<String>,
    pub price: String,
    pub sku: String,
    pub inventory_management: String,
    pub inventory_policy: String,
    pub grams: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
}

/// Payload for updating an existing product in place.
#[derive(Debug, Clone, Serialize)]
pub struct ProductUpdate {
    pub id: i64,
    pub title: String,
    pub body_html: String,
    pub tags: String,
    pub images: Vec<NewImage>,
    pub metafields: Vec<NewMetafield>,
}

/// Payload for attaching an image to a product.
#[derive(Debug, Clone, Serialize)]
pub struct NewImage {
    pub src: String,
    pub position: i32,
    pub alt: String,
}

/// Payload for creating a product metafield.
#[derive(Debug, Clone, Serialize)]
pub struct NewMetafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

impl NewMetafield {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            namespace: "custom".to_string(),
            key: key.into(),
            value: value.into(),
            value_type: value_type.into(),
        }
    }
}

/// A product as returned by the remote platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
    #[serde(default)]
    pub images: Vec<RemoteImage>,
}

/// A variant as returned by the remote platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    pub id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub option1: Option<String>,
    pub inventory_item_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteImage {
    pub id: i64,
    pub src: String,
    #[serde(default)]
    pub position: Option<i32>,
}

/// An existing metafield on the remote platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMetafield {
    pub id: i64,
    pub namespace: String,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
}

/// Remote catalog operations used by the sync and update flows.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Connectivity check; returns the shop name.
    async fn shop_name(&self) -> Result<String>;

    /// The primary inventory location.
    async fn primary_location_id(&self) -> Result<i64>;

    async fn create_product(&self, product: &NewProduct) -> Result<RemoteProduct>;

    async fn get_product(&self, product_id: i64) -> Result<RemoteProduct>;

    async fn update_product(&self, update: &ProductUpdate) -> Result<RemoteProduct>;

    async fn product_metafields(&self, product_id: i64) -> Result<Vec<RemoteMetafield>>;

    async fn set_inventory_level(
        &self,
        location_id: i64,
        inventory_item_id: i64,
        available: i64,
    ) -> Result<()>;

    async fn create_metafield(&self, product_id: i64, metafield: &NewMetafield) -> Result<()>;

    async fn add_image(&self, product_id: i64, image: &NewImage) -> Result<()>;
}
