use crate::errors::Result;
use crate::math::Color;
use crate::renderer::command::ClearCommand;
use crate::renderer::context::{FramebufferId, FramebufferKind, PassState, PostEffect, RenderContext};
use crate::renderer::effects::RenderTarget;

/// Depth-capture target.
///
/// While it exists the scene renders into its color/depth framebuffer
/// instead of the primary target, so that depth can be copied out after
/// each sub-frustum. Its color is copied to the primary target at the end
/// of the frame.
#[derive(Debug)]
pub struct GlobeDepth {
    framebuffer: RenderTarget,
    depth_copy: RenderTarget,
}

impl Default for GlobeDepth {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobeDepth {
    #[must_use]
    pub fn new() -> Self {
        Self {
            framebuffer: RenderTarget::new("Globe Depth"),
            depth_copy: RenderTarget::new("Globe Depth Copy"),
        }
    }

    pub fn update(&mut self, context: &mut dyn RenderContext) -> Result<()> {
        self.framebuffer.ensure(context, FramebufferKind::ColorDepth)?;
        self.depth_copy.ensure(context, FramebufferKind::PackedDepth)?;
        Ok(())
    }

    #[must_use]
    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer.id()
    }

    /// Packed copy of the captured depth.
    #[must_use]
    pub fn depth_copy(&self) -> Option<FramebufferId> {
        self.depth_copy.id()
    }

    pub fn clear(&self, context: &mut dyn RenderContext, pass_state: &PassState, color: Color) -> Result<()> {
        if let Some(framebuffer) = self.framebuffer.id() {
            let pass = PassState {
                framebuffer: Some(framebuffer),
                ..*pass_state
            };
            context.clear(&ClearCommand::color(color), &pass)?;
        }
        Ok(())
    }

    pub fn execute_copy_depth(&self, context: &mut dyn RenderContext) -> Result<()> {
        if let (Some(source), Some(destination)) = (self.framebuffer.id(), self.depth_copy.id()) {
            context.copy_packed_depth(source, destination)?;
        }
        Ok(())
    }

    pub fn execute_copy_color(&self, context: &mut dyn RenderContext, destination: Option<FramebufferId>) -> Result<()> {
        if let Some(source) = self.framebuffer.id() {
            context.copy_color(source, destination)?;
        }
        Ok(())
    }

    /// Draws the captured depth as grayscale into `destination`.
    pub fn execute_debug_globe_depth(
        &self,
        context: &mut dyn RenderContext,
        destination: Option<FramebufferId>,
    ) -> Result<()> {
        if let Some(source) = self.depth_copy.id() {
            context.post_process(PostEffect::DepthVisualization, source, destination)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        self.framebuffer.destroy(context);
        self.depth_copy.destroy(context);
    }
}
