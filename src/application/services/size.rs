//! Memoised target size resolution.

use tokio::sync::OnceCell;

use crate::domain::entities::{Size, SizePolicy};

/// Resolves a request's size at most once and caches the answer.
#[derive(Debug)]
pub struct LazySize {
    policy: SizePolicy,
    resolved: OnceCell<Size>,
}

impl LazySize {
    /// Wraps a size policy without resolving it.
    #[must_use]
    pub fn new(policy: SizePolicy) -> Self {
        Self {
            policy,
            resolved: OnceCell::new(),
        }
    }

    /// Returns the size, asking the resolver only on the first call.
    pub async fn get(&self) -> Size {
        *self
            .resolved
            .get_or_init(|| async {
                match &self.policy {
                    SizePolicy::Fixed(size) => *size,
                    SizePolicy::Resolver(resolver) => resolver.size().await,
                }
            })
            .await
    }

    /// Returns the size if it was already resolved.
    #[must_use]
    pub fn peek(&self) -> Option<Size> {
        match &self.policy {
            SizePolicy::Fixed(size) => Some(*size),
            SizePolicy::Resolver(_) => self.resolved.get().copied(),
        }
    }
}
