//! Auxiliary Framebuffers
//!
//! Depth capture, translucency accumulation, anti-aliasing, sun bloom and
//! the depth plane. Each effect creates its framebuffers on first use,
//! recreates them when the drawing buffer is resized, and must be destroyed
//! with its scene.

mod depth_plane;
mod fxaa;
mod globe_depth;
mod oit;
mod pick_depth;
mod sun;

pub use depth_plane::DepthPlane;
pub use fxaa::Fxaa;
pub use globe_depth::GlobeDepth;
pub use oit::OrderIndependentTranslucency;
pub use pick_depth::PickDepth;
pub use sun::SunPostProcess;

use crate::errors::Result;
use crate::renderer::context::{FramebufferDescriptor, FramebufferId, FramebufferKind, RenderContext};

/// A framebuffer that follows the drawing buffer size.
#[derive(Debug)]
pub(crate) struct RenderTarget {
    label: &'static str,
    current: Option<(FramebufferId, FramebufferDescriptor)>,
}

impl RenderTarget {
    pub(crate) const fn new(label: &'static str) -> Self {
        Self {
            label,
            current: None,
        }
    }

    /// Returns a framebuffer of `kind` sized to the drawing buffer, creating
    /// or replacing it as needed.
    pub(crate) fn ensure(&mut self, context: &mut dyn RenderContext, kind: FramebufferKind) -> Result<FramebufferId> {
        let descriptor = FramebufferDescriptor {
            label: self.label,
            size: context.drawing_buffer_size(),
            kind,
        };
        if let Some((id, current)) = &self.current {
            if *current == descriptor {
                return Ok(*id);
            }
        }
        self.destroy(context);

        let id = context.create_framebuffer(&descriptor)?;
        log::debug!(
            "Created {} framebuffer {}x{}",
            self.label,
            descriptor.size.x,
            descriptor.size.y
        );
        self.current = Some((id, descriptor));
        Ok(id)
    }

    pub(crate) fn id(&self) -> Option<FramebufferId> {
        self.current.as_ref().map(|(id, _)| *id)
    }

    pub(crate) fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some((id, _)) = self.current.take() {
            context.destroy_framebuffer(id);
        }
    }
}
