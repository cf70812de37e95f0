//! Ports for result sinks and animated handoffs.

use std::time::Duration;

use crate::domain::entities::{Bitmap, ErrorResult, SuccessResult};

/// Receives the visible outcome of a request.
///
/// Callbacks run on the loader's orchestration runtime, never on a worker.
/// A target that keeps displaying a result should keep a clone of
/// `result.image`, which holds a reference on the bitmap.
pub trait Target: Send + Sync {
    /// Called once, before the size is resolved.
    fn on_start(&self, _placeholder: Option<&Bitmap>) {}

    /// Called with a successful result when no animation runs.
    fn on_success(&self, _result: &SuccessResult) {}

    /// Called with a failed result.
    fn on_error(&self, _result: &ErrorResult) {}

    /// Returns the animated-handoff view of this target, if it has one.
    fn as_transition_target(&self) -> Option<&dyn TransitionTarget> {
        None
    }
}

/// A target able to animate between its current content and a new result.
pub trait TransitionTarget: Send + Sync {
    /// Returns true if the target is currently visible.
    fn is_visible(&self) -> bool;

    /// Returns the currently displayed image, if any.
    fn current_image(&self) -> Option<Bitmap>;

    /// Starts displaying `result`, animated from `from`. The returned
    /// animation drives the handoff.
    fn crossfade(
        &self,
        from: Option<Bitmap>,
        result: &SuccessResult,
        duration: Duration,
    ) -> Box<dyn Animation>;
}

/// A running animation.
pub trait Animation: Send {
    /// Registers a callback fired once when the animation ends.
    fn register_end_callback(&mut self, callback: Box<dyn FnOnce() + Send>);

    /// Drops any registered callbacks.
    fn clear_end_callbacks(&mut self);

    /// Stops the animation immediately.
    fn stop(&mut self);

    /// Returns true once the animation has ended or was stopped.
    fn is_finished(&self) -> bool;
}
