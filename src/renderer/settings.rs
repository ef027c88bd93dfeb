//! Scene Settings
//!
//! Construction-time and runtime configuration of the pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stratum::renderer::settings::SceneSettings;
//!
//! // Defaults: ratio 1000, OIT + FXAA + sun bloom on.
//! let settings = SceneSettings::default();
//!
//! // Partial documents fill the rest from defaults.
//! let settings = SceneSettings::from_json(r#"{ "fxaa": false, "far_to_near_ratio": 500.0 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StratumError};
use crate::math::Color;

// ---------------------------------------------------------------------------
// PickRectangle
// ---------------------------------------------------------------------------

/// Footprint of a pick, in pixels, centered on the cursor.
///
/// Both sides must be odd so the footprint has a center texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRectangle {
    pub width: u32,
    pub height: u32,
}

impl Default for PickRectangle {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// SceneSettings
// ---------------------------------------------------------------------------

/// Pipeline configuration.
///
/// Every field has a default, so settings can be loaded from partial JSON
/// documents with [`SceneSettings::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Far-to-near ratio tolerated within one sub-frustum.
    ///
    /// Larger values mean fewer sub-frustums (fewer passes over the bins)
    /// and more depth-precision artifacts. Default: `1000.0`.
    pub far_to_near_ratio: f64,

    /// Use order-independent translucency when the context supports it.
    ///
    /// When disabled or unsupported, translucent commands are sorted back to
    /// front by the squared distance of their bounding-volume centers.
    pub order_independent_translucency: bool,

    /// Run the FXAA post-process on the final image.
    pub fxaa: bool,

    /// Apply the bloom post-process around the sun.
    pub sun_bloom: bool,

    /// Restrict the scene to [`SceneMode::Scene3D`](crate::scene::mode::SceneMode::Scene3D).
    pub scene_3d_only: bool,

    /// Return render errors from `Scene::render` after notifying listeners.
    pub rethrow_render_errors: bool,

    /// Copy the ground-surface depth after the globe pass of each
    /// sub-frustum so later passes can sample it.
    pub copy_globe_depth: bool,

    /// How long the camera must be still before `camera_move_end` fires.
    pub camera_event_wait_time_ms: u64,

    /// Clear color of the primary target.
    pub background_color: Color,

    pub pick_rectangle: PickRectangle,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            far_to_near_ratio: 1000.0,
            order_independent_translucency: true,
            fxaa: true,
            sun_bloom: true,
            scene_3d_only: false,
            rethrow_render_errors: false,
            copy_globe_depth: false,
            camera_event_wait_time_ms: 500,
            background_color: Color::BLACK,
            pick_rectangle: PickRectangle::default(),
        }
    }
}

impl SceneSettings {
    /// Parses and validates a (possibly partial) JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.far_to_near_ratio.is_finite() || self.far_to_near_ratio <= 1.0 {
            return Err(StratumError::InvalidSettings(format!(
                "far_to_near_ratio must be finite and greater than 1, got {}",
                self.far_to_near_ratio
            )));
        }
        let PickRectangle { width, height } = self.pick_rectangle;
        if width == 0 || height == 0 || width % 2 == 0 || height % 2 == 0 {
            return Err(StratumError::InvalidSettings(format!(
                "pick_rectangle sides must be odd and non-zero, got {width}x{height}"
            )));
        }
        Ok(())
    }
}
