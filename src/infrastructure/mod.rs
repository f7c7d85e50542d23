//! Infrastructure layer: configuration, logging, persistence, input loading,
//! and the Shopify Admin API client.

pub mod config;
pub mod csv_loader;
pub mod database_connection;
pub mod logging;
pub mod mapping_repository;
pub mod shopify;

pub use config::{AppConfig, ShopifyConfig};
pub use database_connection::DatabaseConnection;
pub use mapping_repository::MappingRepository;
pub use shopify::ShopifyClient;
