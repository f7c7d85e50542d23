//! Application layer: validation, payload preparation, and the sync/update
//! orchestrators.

pub mod preparation;
pub mod sync;
pub mod update;
pub mod validation;

pub use sync::{SyncOrchestrator, SyncReport, SyncSettings};
pub use update::{UpdateOrchestrator, UpdateReport};
pub use validation::{ValidationError, validate_product_row};
