//! Hands a successful result to its target, animating when it pays off.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::domain::entities::{DataSource, ImageRequest, SuccessResult, TransitionPolicy};
use crate::domain::errors::LoadError;
use crate::domain::ports::{Animation, EventListener};

/// Stops a running animation and drops its callbacks unless it finished.
struct AnimationGuard {
    animation: Box<dyn Animation>,
}

impl Drop for AnimationGuard {
    fn drop(&mut self) {
        self.animation.clear_end_callbacks();
        if !self.animation.is_finished() {
            self.animation.stop();
        }
    }
}

/// Delivers `result` to the request's target.
///
/// Memory cache hits, invisible targets and requests without a crossfade are
/// delivered immediately. Otherwise the target crossfades and this call
/// suspends until the animation ends. Cancelling `token` stops the animation
/// and returns [`LoadError::Cancelled`].
///
/// # Errors
/// Returns [`LoadError::Cancelled`] if the token fires mid-animation.
pub async fn deliver_success(
    request: &ImageRequest,
    result: &SuccessResult,
    listener: &dyn EventListener,
    token: &CancellationToken,
) -> Result<(), LoadError> {
    let Some(target) = request.target() else {
        return Ok(());
    };

    let duration = match request.transition() {
        TransitionPolicy::Crossfade { duration } if result.data_source != DataSource::MemoryCache => {
            duration
        }
        _ => {
            target.on_success(result);
            return Ok(());
        }
    };

    let guard = match target.as_transition_target() {
        Some(transition) if transition.is_visible() => {
            let from = transition.current_image();
            AnimationGuard {
                animation: transition.crossfade(from, result, duration),
            }
        }
        _ => {
            target.on_success(result);
            return Ok(());
        }
    };

    let mut guard = guard;
    let (done_tx, done_rx) = oneshot::channel();
    guard.animation.register_end_callback(Box::new(move || {
        let _ = done_tx.send(());
    }));

    listener.transition_start(request);
    trace!(request = %request.id(), ?duration, "Crossfade started");

    tokio::select! {
        biased;
        () = token.cancelled() => {
            drop(guard);
            trace!(request = %request.id(), "Crossfade stopped");
            return Err(LoadError::Cancelled);
        }
        _ = done_rx => {}
    }

    drop(guard);
    listener.transition_end(request);
    Ok(())
}
