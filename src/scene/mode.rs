use serde::{Deserialize, Serialize};

/// Viewing mode of the scene.
///
/// Only [`SceneMode::Scene3D`] has a horizon occluder and a depth plane;
/// [`SceneMode::Scene2D`] uses an orthographic projection and cannot
/// reconstruct positions from depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SceneMode {
    /// Transitioning between modes.
    Morphing,
    /// Flat map, orthographic top-down view.
    Scene2D,
    /// 2.5D perspective over a flat map.
    ColumbusView,
    #[default]
    Scene3D,
}

impl SceneMode {
    #[inline]
    #[must_use]
    pub fn is_flat(self) -> bool {
        matches!(self, Self::Scene2D)
    }
}
