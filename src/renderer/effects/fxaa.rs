use crate::errors::Result;
use crate::math::Color;
use crate::renderer::command::ClearCommand;
use crate::renderer::context::{FramebufferId, FramebufferKind, PassState, PostEffect, RenderContext};
use crate::renderer::effects::RenderTarget;

/// FXAA input target. The scene renders here when no depth capture is
/// active; the final pass filters it into the primary target.
#[derive(Debug)]
pub struct Fxaa {
    target: RenderTarget,
}

impl Default for Fxaa {
    fn default() -> Self {
        Self::new()
    }
}

impl Fxaa {
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: RenderTarget::new("FXAA"),
        }
    }

    pub fn update(&mut self, context: &mut dyn RenderContext) -> Result<()> {
        self.target.ensure(context, FramebufferKind::ColorDepth)?;
        Ok(())
    }

    #[must_use]
    pub fn color_framebuffer(&self) -> Option<FramebufferId> {
        self.target.id()
    }

    pub fn clear(&self, context: &mut dyn RenderContext, pass_state: &PassState, color: Color) -> Result<()> {
        if let Some(framebuffer) = self.target.id() {
            let pass = PassState {
                framebuffer: Some(framebuffer),
                ..*pass_state
            };
            context.clear(&ClearCommand::color(color), &pass)?;
        }
        Ok(())
    }

    pub fn execute(&self, context: &mut dyn RenderContext, destination: Option<FramebufferId>) -> Result<()> {
        if let Some(source) = self.target.id() {
            context.post_process(PostEffect::Fxaa, source, destination)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        self.target.destroy(context);
    }
}
