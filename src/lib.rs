//! Catalog synchronization between CSV sources and the Shopify Admin API.
//!
//! Repeated runs update rather than duplicate: every created product and
//! variant is correlated with its internal reference in a local SQLite
//! mapping store, and every mutation attempt lands in an append-only sync
//! log.

pub mod application;
pub mod domain;
pub mod infrastructure;
