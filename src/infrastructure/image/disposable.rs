//! Handle to a request running in the background.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::entities::ImageResult;
use crate::domain::errors::Cancelled;

/// Cancels or awaits an enqueued request.
///
/// Dropping the handle does not cancel the request.
#[derive(Debug)]
pub struct Disposable {
    token: CancellationToken,
    job: JoinHandle<Result<ImageResult, Cancelled>>,
}

impl Disposable {
    pub(crate) const fn new(
        token: CancellationToken,
        job: JoinHandle<Result<ImageResult, Cancelled>>,
    ) -> Self {
        Self { token, job }
    }

    /// Cancels the request. Its target receives no result.
    pub fn dispose(&self) {
        self.token.cancel();
    }

    /// Returns true once the request was disposed or has completed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled() || self.job.is_finished()
    }

    /// Waits for the request to finish.
    ///
    /// # Errors
    /// Returns [`Cancelled`] if the request was disposed before delivering.
    pub async fn wait(self) -> Result<ImageResult, Cancelled> {
        self.job.await.unwrap_or_else(|e| {
            warn!(error = %e, "Image request task failed");
            Err(Cancelled)
        })
    }
}
