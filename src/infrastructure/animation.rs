//! Timer-driven [`Animation`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::domain::ports::Animation;

type EndCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct AnimationState {
    finished: bool,
    callbacks: Vec<EndCallback>,
}

fn finish(state: &Mutex<AnimationState>) {
    let callbacks = {
        let mut state = state.lock();
        if state.finished {
            return;
        }
        state.finished = true;
        std::mem::take(&mut state.callbacks)
    };
    for callback in callbacks {
        callback();
    }
}

/// An animation that ends after a fixed duration.
///
/// Without a tokio runtime the animation finishes as soon as it starts.
pub struct TimedAnimation {
    state: Arc<Mutex<AnimationState>>,
    timer: Option<JoinHandle<()>>,
}

impl TimedAnimation {
    /// Starts an animation lasting `duration`.
    #[must_use]
    pub fn start(duration: Duration) -> Self {
        let state = Arc::new(Mutex::new(AnimationState::default()));
        let timer = match Handle::try_current() {
            Ok(handle) => {
                let state = Arc::clone(&state);
                Some(handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    finish(&state);
                }))
            }
            Err(_) => {
                finish(&state);
                None
            }
        };
        Self { state, timer }
    }
}

impl Animation for TimedAnimation {
    fn register_end_callback(&mut self, callback: Box<dyn FnOnce() + Send>) {
        let mut state = self.state.lock();
        if state.finished {
            drop(state);
            callback();
        } else {
            state.callbacks.push(callback);
        }
    }

    fn clear_end_callbacks(&mut self) {
        self.state.lock().callbacks.clear();
    }

    fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        finish(&self.state);
    }

    fn is_finished(&self) -> bool {
        self.state.lock().finished
    }
}

impl Drop for TimedAnimation {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for TimedAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedAnimation")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
