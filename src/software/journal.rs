use crate::renderer::context::{DrawMode, PostEffect, Rectangle};

/// Label reported for the primary target.
pub const PRIMARY_LABEL: &str = "Primary";

/// One operation executed by a [`SoftwareContext`](super::SoftwareContext).
///
/// Targets are named by the label of their framebuffer descriptor, or
/// [`PRIMARY_LABEL`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    SetView {
        near: f64,
        far: f64,
    },
    Clear {
        target: &'static str,
        color: bool,
        depth: bool,
    },
    Draw {
        label: String,
        target: &'static str,
        mode: DrawMode,
        /// Projection range active for the draw.
        near: f64,
        far: f64,
    },
    Compute {
        label: String,
    },
    CopyColor {
        source: &'static str,
        destination: &'static str,
    },
    CopyPackedDepth {
        source: &'static str,
        destination: &'static str,
    },
    ResolveTranslucency {
        destination: &'static str,
    },
    PostProcess {
        effect: PostEffect,
        destination: &'static str,
    },
    ReadPixels {
        source: &'static str,
        rectangle: Rectangle,
    },
    EndFrame,
}

impl ContextEvent {
    /// Label of a draw event.
    #[must_use]
    pub fn draw_label(&self) -> Option<&str> {
        match self {
            Self::Draw { label, .. } => Some(label),
            _ => None,
        }
    }
}
