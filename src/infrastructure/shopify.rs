//! Shopify Admin REST client
//!
//! Thin JSON client over the Admin API with a direct rate limiter ahead of
//! every call so bursts never trip the platform's request budget. Non-2xx
//! responses surface as errors carrying the status and response body.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, direct::NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::catalog::{
    CatalogApi, NewImage, NewMetafield, NewProduct, ProductUpdate, RemoteMetafield, RemoteProduct,
};
use crate::infrastructure::config::ShopifyConfig;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Requests per second against the Admin API. The REST bucket allows 2/s;
/// staying at that rate avoids 429 responses without retry logic.
const MAX_REQUESTS_PER_SECOND: u32 = 2;

pub struct ShopifyClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

// Envelope types: the Admin API wraps every resource in a named object.
mod wire {
    use serde::{Deserialize, Serialize};

    use crate::domain::catalog::{
        NewImage, NewMetafield, NewProduct, ProductUpdate, RemoteMetafield, RemoteProduct,
    };

    #[derive(Serialize)]
    pub struct ProductCreateRequest<'a> {
        pub product: &'a NewProduct,
    }

    #[derive(Serialize)]
    pub struct ProductUpdateRequest<'a> {
        pub product: &'a ProductUpdate,
    }

    #[derive(Serialize)]
    pub struct MetafieldRequest<'a> {
        pub metafield: &'a NewMetafield,
    }

    #[derive(Serialize)]
    pub struct ImageRequest<'a> {
        pub image: &'a NewImage,
    }

    #[derive(Serialize)]
    pub struct InventoryLevelSet {
        pub location_id: i64,
        pub inventory_item_id: i64,
        pub available: i64,
    }

    #[derive(Deserialize)]
    pub struct ProductEnvelope {
        pub product: RemoteProduct,
    }

    #[derive(Deserialize)]
    pub struct MetafieldsEnvelope {
        #[serde(default)]
        pub metafields: Vec<RemoteMetafield>,
    }

    #[derive(Deserialize)]
    pub struct ShopEnvelope {
        pub shop: Shop,
    }

    #[derive(Deserialize)]
    pub struct Shop {
        pub name: String,
    }

    #[derive(Deserialize)]
    pub struct LocationsEnvelope {
        #[serde(default)]
        pub locations: Vec<Location>,
    }

    #[derive(Deserialize)]
    pub struct Location {
        pub id: i64,
    }
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_TOKEN_HEADER,
            HeaderValue::from_str(&config.access_token).context("invalid access token")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(MAX_REQUESTS_PER_SECOND).context("rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            base_url: config.base_url(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    async fn send(&self, method: Method, path: &str, body: Option<&impl Serialize>) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{path}", self.base_url);
        debug!("{method} {url}");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} {path} returned {status}: {body}");
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        response
            .json()
            .await
            .with_context(|| format!("failed to decode response from {path}"))
    }
}

#[async_trait]
impl CatalogApi for ShopifyClient {
    async fn shop_name(&self) -> Result<String> {
        let envelope: wire::ShopEnvelope = self.get_json("shop.json").await?;
        Ok(envelope.shop.name)
    }

    async fn primary_location_id(&self) -> Result<i64> {
        let envelope: wire::LocationsEnvelope = self.get_json("locations.json").await?;
        envelope
            .locations
            .first()
            .map(|location| location.id)
            .context("no inventory location found")
    }

    async fn create_product(&self, product: &NewProduct) -> Result<RemoteProduct> {
        let response = self
            .send(
                Method::POST,
                "products.json",
                Some(&wire::ProductCreateRequest { product }),
            )
            .await?;
        let envelope: wire::ProductEnvelope =
            response.json().await.context("failed to decode created product")?;
        Ok(envelope.product)
    }

    async fn get_product(&self, product_id: i64) -> Result<RemoteProduct> {
        let envelope: wire::ProductEnvelope =
            self.get_json(&format!("products/{product_id}.json")).await?;
        Ok(envelope.product)
    }

    async fn update_product(&self, update: &ProductUpdate) -> Result<RemoteProduct> {
        let response = self
            .send(
                Method::PUT,
                &format!("products/{}.json", update.id),
                Some(&wire::ProductUpdateRequest { product: update }),
            )
            .await?;
        let envelope: wire::ProductEnvelope =
            response.json().await.context("failed to decode updated product")?;
        Ok(envelope.product)
    }

    async fn product_metafields(&self, product_id: i64) -> Result<Vec<RemoteMetafield>> {
        let envelope: wire::MetafieldsEnvelope = self
            .get_json(&format!("products/{product_id}/metafields.json"))
            .await?;
        Ok(envelope.metafields)
    }

    async fn set_inventory_level(
        &self,
        location_id: i64,
        inventory_item_id: i64,
        available: i64,
    ) -> Result<()> {
        self.send(
            Method::POST,
            "inventory_levels/set.json",
            Some(&wire::InventoryLevelSet {
                location_id,
                inventory_item_id,
                available,
            }),
        )
        .await?;
        Ok(())
    }

    async fn create_metafield(&self, product_id: i64, metafield: &NewMetafield) -> Result<()> {
        self.send(
            Method::POST,
            &format!("products/{product_id}/metafields.json"),
            Some(&wire::MetafieldRequest { metafield }),
        )
        .await?;
        Ok(())
    }

    async fn add_image(&self, product_id: i64, image: &NewImage) -> Result<()> {
        self.send(
            Method::POST,
            &format!("products/{product_id}/images.json"),
            Some(&wire::ImageRequest { image }),
        )
        .await?;
        Ok(())
    }
}
