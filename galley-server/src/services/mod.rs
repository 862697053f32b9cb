//! Service layer

pub mod expiry;
pub mod image_storage;

pub use expiry::{ConsumeOutcome, ExpiryService, ExpiryStatus, ProductRef, VerifyOutcome, evaluate};
pub use image_storage::{ImageStorage, LocalImageStorage, StoredImage};
