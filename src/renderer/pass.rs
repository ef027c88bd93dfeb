//! Render pass enumeration.
//!
//! Passes are ordered low to high. [`Pass::Compute`] and [`Pass::Overlay`] are
//! out-of-band: they bypass frustum binning and run once per frame. Every
//! other pass is binned per sub-frustum and executed in declaration order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pass {
    Compute,
    /// Ground-surface geometry (terrain).
    Globe,
    /// Decorations clamped to the ground.
    Ground,
    Opaque,
    Translucent,
    Overlay,
}

impl Pass {
    /// Passes that are binned per sub-frustum, in execution order.
    pub const BINNED: [Pass; 4] = [Pass::Globe, Pass::Ground, Pass::Opaque, Pass::Translucent];

    pub const BINNED_COUNT: usize = Self::BINNED.len();

    /// Index into a sub-frustum's per-pass bins, `None` for out-of-band passes.
    #[inline]
    #[must_use]
    pub fn bin_index(self) -> Option<usize> {
        match self {
            Self::Globe => Some(0),
            Self::Ground => Some(1),
            Self::Opaque => Some(2),
            Self::Translucent => Some(3),
            Self::Compute | Self::Overlay => None,
        }
    }

    /// Generic opaque passes between the ground-clamped and translucent passes.
    #[must_use]
    pub fn opaque_passes() -> impl Iterator<Item = Pass> {
        Self::BINNED
            .into_iter()
            .filter(|p| *p > Pass::Ground && *p < Pass::Translucent)
    }

    #[inline]
    #[must_use]
    pub fn is_out_of_band(self) -> bool {
        self.bin_index().is_none()
    }
}
