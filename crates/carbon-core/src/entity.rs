//! The contract every cacheable resource fulfils.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

/// A remote resource with a stable identity that can refresh itself.
///
/// `Display` provides the human-readable label (`<School abc>`).
#[async_trait]
pub trait Entity: fmt::Display + Send + Sync + 'static {
    /// Stable identifier used as the cache key.
    ///
    /// Empty until the entity has been fetched successfully at least once.
    fn unique_id(&self) -> String;

    /// Refresh from the remote service in place.
    ///
    /// Transport failures are reported through the event bus and leave the
    /// previous state untouched.
    async fn fetch(&mut self) -> &mut Self;

    /// Plain JSON representation for persistence and debugging.
    fn to_json(&self) -> Value;
}
