//! Port for measuring the target size.

use async_trait::async_trait;

use crate::domain::entities::Size;

/// Resolves the size a request should be loaded at.
#[async_trait]
pub trait SizeResolver: Send + Sync {
    /// Returns the target size. May suspend, e.g. until layout completes.
    async fn size(&self) -> Size;
}
