use crate::errors::Result;
use crate::renderer::context::{FramebufferId, FramebufferKind, PostEffect, RenderContext};
use crate::renderer::effects::RenderTarget;

/// Packed depth snapshot of one sub-frustum, read back by position picking.
#[derive(Debug)]
pub struct PickDepth {
    target: RenderTarget,
    /// Projection range the snapshot was rendered with.
    near: f64,
    far: f64,
}

impl Default for PickDepth {
    fn default() -> Self {
        Self::new()
    }
}

impl PickDepth {
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: RenderTarget::new("Pick Depth"),
            near: 0.0,
            far: 0.0,
        }
    }

    pub fn update(&mut self, context: &mut dyn RenderContext) -> Result<()> {
        self.target.ensure(context, FramebufferKind::PackedDepth)?;
        Ok(())
    }

    #[must_use]
    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.target.id()
    }

    /// Near/far of the opaque projection used for the snapshot.
    #[must_use]
    pub fn near_far(&self) -> (f64, f64) {
        (self.near, self.far)
    }

    pub fn execute_copy_depth(
        &mut self,
        context: &mut dyn RenderContext,
        source: FramebufferId,
        near: f64,
        far: f64,
    ) -> Result<()> {
        if let Some(destination) = self.target.id() {
            context.copy_packed_depth(source, destination)?;
            self.near = near;
            self.far = far;
        }
        Ok(())
    }

    pub fn execute_debug_pick_depth(
        &self,
        context: &mut dyn RenderContext,
        destination: Option<FramebufferId>,
    ) -> Result<()> {
        if let Some(source) = self.target.id() {
            context.post_process(PostEffect::DepthVisualization, source, destination)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        self.target.destroy(context);
    }
}
