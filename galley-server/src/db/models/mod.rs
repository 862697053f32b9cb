//! Database models

pub mod expired;
pub mod product;
pub mod sale;
pub mod serde_helpers;

pub use expired::ExpiredRecord;
pub use product::{Product, ProductCreate, ProductStatus};
pub use sale::{SaleRecord, Segment};
