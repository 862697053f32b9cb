//! Shared types for the Galley inventory backend
//!
//! Common types used across crates: the unified error system
//! (error codes, [`error::AppError`], [`error::ApiResponse`]) and the
//! HTTP types it depends on.

pub mod error;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
