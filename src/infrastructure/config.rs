//! Application configuration
//!
//! All settings come from the environment (a `.env` file is honored when
//! present). Configuration is an explicit struct handed to constructors;
//! missing credentials are a fatal startup error.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Shopify Admin API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyConfig {
    /// Shop host, e.g. `my-shop.myshopify.com` (scheme prefixes are stripped).
    pub shop_url: String,
    pub access_token: String,
    pub api_version: String,
}

impl ShopifyConfig {
    /// Base URL for Admin REST calls.
    pub fn base_url(&self) -> String {
        format!("https://{}/admin/api/{}", self.shop_url, self.api_version)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub shopify: ShopifyConfig,
    pub database_url: String,
    /// Pause between consecutive remote mutations, in milliseconds.
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Sale price = supplier cost times this factor.
    pub price_multiplier: f64,
    /// Vendor name stamped on every created product.
    pub vendor: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .ok()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Build the configuration from the environment.
    ///
    /// `SHOPIFY_ACCESS_TOKEN` and `SHOPIFY_SHOP_URL` are required; everything
    /// else has a sensible default.
    pub fn from_env() -> Result<Self> {
        let access_token = match std::env::var("SHOPIFY_ACCESS_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token,
            _ => bail!("SHOPIFY_ACCESS_TOKEN is not configured"),
        };
        let shop_url = match std::env::var("SHOPIFY_SHOP_URL") {
            Ok(url) if !url.trim().is_empty() => url
                .trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            _ => bail!("SHOPIFY_SHOP_URL is not configured"),
        };

        Ok(Self {
            shopify: ShopifyConfig {
                shop_url,
                access_token,
                api_version: env_or("SHOPIFY_API_VERSION", "2024-01"),
            },
            database_url: env_or("DATABASE_URL", "sqlite:data/catalog_sync.db"),
            request_delay_ms: env_parse("REQUEST_DELAY_MS", 1000)?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT", 30)?,
            price_multiplier: env_parse("PRICE_MULTIPLIER", 2.2)?,
            vendor: env_or("PRODUCT_VENDOR", "Joyas Armaan"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_version() {
        let config = ShopifyConfig {
            shop_url: "my-shop.myshopify.com".into(),
            access_token: "shpat_test".into(),
            api_version: "2024-01".into(),
        };
        assert_eq!(
            config.base_url(),
            "https://my-shop.myshopify.com/admin/api/2024-01"
        );
    }
}
