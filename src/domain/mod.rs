//! Domain layer: catalog rows, reference resolution, mapping entities, and
//! the remote catalog trait.

pub mod catalog;
pub mod mapping;
pub mod record;
pub mod reference;

pub use catalog::CatalogApi;
pub use mapping::{MappedProduct, ProductMapping, SyncAction, SyncStatus, VariantMapping};
pub use record::RawRow;
pub use reference::ProductGroup;
