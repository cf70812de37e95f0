//! Target size, scale and precision types.

use serde::{Deserialize, Serialize};

/// The size an image should be loaded at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Size {
    /// Load at the source's intrinsic dimensions.
    #[default]
    Original,
    /// Load to fit or fill the given pixel dimensions.
    Pixels {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
}

impl Size {
    /// Creates a pixel size.
    #[must_use]
    pub const fn pixels(width: u32, height: u32) -> Self {
        Self::Pixels { width, height }
    }

    /// Returns true for [`Size::Original`].
    #[must_use]
    pub const fn is_original(self) -> bool {
        matches!(self, Self::Original)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Pixels { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

/// How an image is scaled into its target size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Cover the target; one dimension may overflow.
    Fill,
    /// Fit inside the target; one dimension may fall short.
    #[default]
    Fit,
}

impl Scale {
    /// Multiplier that maps `src` dimensions onto `dst` under this scale.
    #[must_use]
    pub fn multiplier(self, src: (u32, u32), dst: (u32, u32)) -> f64 {
        if src.0 == 0 || src.1 == 0 {
            return 1.0;
        }
        let width_percent = f64::from(dst.0) / f64::from(src.0);
        let height_percent = f64::from(dst.1) / f64::from(src.1);
        match self {
            Self::Fill => width_percent.max(height_percent),
            Self::Fit => width_percent.min(height_percent),
        }
    }
}

/// Whether the loaded image must match the requested size exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Dimensions must match the request.
    Exact,
    /// Dimensions may differ, e.g. a larger cached image is acceptable.
    Inexact,
    /// Inexact when the size was resolved at runtime, exact otherwise.
    #[default]
    Automatic,
}
