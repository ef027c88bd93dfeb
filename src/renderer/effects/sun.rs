use crate::errors::Result;
use crate::renderer::context::{FramebufferId, FramebufferKind, PostEffect, RenderContext};
use crate::renderer::effects::RenderTarget;

/// Bloom around the sun. The sun renders into this target, which is then
/// composited with its bloom into the scene's next render target.
#[derive(Debug)]
pub struct SunPostProcess {
    target: RenderTarget,
}

impl Default for SunPostProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl SunPostProcess {
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: RenderTarget::new("Sun Bloom"),
        }
    }

    /// Returns the framebuffer the sun should be drawn into.
    pub fn update(&mut self, context: &mut dyn RenderContext) -> Result<FramebufferId> {
        self.target.ensure(context, FramebufferKind::ColorDepth)
    }

    pub fn execute(&self, context: &mut dyn RenderContext, destination: Option<FramebufferId>) -> Result<()> {
        if let Some(source) = self.target.id() {
            context.post_process(PostEffect::SunBloom, source, destination)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        self.target.destroy(context);
    }
}
