//! Error Types
//!
//! This module defines the error types used throughout the pipeline.
//!
//! # Overview
//!
//! The main error type [`StratumError`] covers:
//! - Precondition violations (unsupported operations for the current mode or
//!   context capabilities, invalid arguments)
//! - Graphics context failures surfaced while executing a frame
//! - Configuration loading and validation
//!
//! Degenerate frames (nothing visible, collapsed near/far) are not errors; the
//! frustum partitioner falls back to the camera's own range instead.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, StratumError>`.
//!
//! ```rust,ignore
//! use stratum::errors::{StratumError, Result};
//!
//! fn position_at(scene: &mut Scene<SoftwareContext>) -> Result<()> {
//!     let _world = scene.pick_position(DVec2::new(10.0, 20.0))?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::mode::SceneMode;

/// The main error type for the Stratum pipeline.
#[derive(Error, Debug)]
pub enum StratumError {
    // ========================================================================
    // Precondition Violations
    // ========================================================================
    /// A required argument was missing or out of range.
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        name: &'static str,
        /// Human readable reason
        reason: String,
    },

    /// The operation is not available with the current context.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// `pick_position` needs depth texture support from the context.
    #[error("Picking from the depth buffer is not supported. Check pick_position_supported().")]
    PickPositionUnsupported,

    /// `pick_position` cannot invert an orthographic projection.
    #[error("Picking from the depth buffer is not supported for 2D or orthographic views.")]
    OrthographicPickPosition,

    /// The scene was created 3D-only and a different mode was requested.
    #[error("Only SceneMode::Scene3D is valid when scene_3d_only is set (requested {0:?})")]
    SceneModeRestricted(SceneMode),

    /// The scene was destroyed and can no longer render or pick.
    #[error("The scene has been destroyed")]
    Destroyed,

    // ========================================================================
    // Graphics Context Errors
    // ========================================================================
    /// Generic failure reported by the graphics context.
    #[error("Render context error: {0}")]
    Context(String),

    /// A framebuffer id does not refer to a live framebuffer.
    #[error("Framebuffer not found: {0}")]
    FramebufferMissing(String),

    /// A mesh handle does not refer to a live mesh.
    #[error("Mesh not found: {0}")]
    MeshMissing(String),

    /// A readback rectangle falls outside the framebuffer.
    #[error("Readback rectangle {x},{y} {width}x{height} exceeds framebuffer {fb_width}x{fb_height}")]
    ReadbackOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        fb_width: u32,
        fb_height: u32,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings JSON failed to parse.
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

/// Alias for `Result<T, StratumError>`.
pub type Result<T> = std::result::Result<T, StratumError>;
