//! Identifier generation
//!
//! Record keys and sale tags are derived from an injected [`IdSource`]
//! instead of calling the UUID generator inline. Handlers and services
//! receive the source through [`ServerState`](crate::core::ServerState),
//! so tests can substitute a deterministic sequence.

use uuid::Uuid;

/// Source of fresh record identifiers
pub trait IdSource: Send + Sync {
    /// Produce a new unique identifier
    ///
    /// Derived tags use up to the first six characters; shorter ids
    /// are tolerated and simply yield shorter tags.
    fn next_id(&self) -> String;
}

/// Production identifier source backed by UUID v4
///
/// Keys are emitted in simple (dash-free) hex form so they embed
/// directly into record ids without escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
