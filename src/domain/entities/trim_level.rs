//! Memory pressure severity levels.

use serde::{Deserialize, Serialize};

/// How hard caches and pools should shed memory, from mildest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrimLevel {
    /// Running normally, memory is getting tight.
    RunningModerate,
    /// Running, memory is low.
    RunningLow,
    /// Running, memory is critically low.
    RunningCritical,
    /// The user interface is no longer visible.
    UiHidden,
    /// The process moved to the background.
    Background,
    /// The process is a candidate for reclamation.
    Moderate,
    /// Release everything that can be released.
    Complete,
}

impl TrimLevel {
    /// Returns true if caches should be emptied entirely.
    #[must_use]
    pub fn clears_everything(self) -> bool {
        self >= Self::Background
    }

    /// Returns true if caches should shrink to half their budget.
    #[must_use]
    pub fn halves(self) -> bool {
        (Self::RunningLow..Self::UiHidden).contains(&self)
    }
}
