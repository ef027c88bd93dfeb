use crate::errors::Result;
use crate::math::Color;
use crate::renderer::command::ClearCommand;
use crate::renderer::context::{
    ContextCapabilities, FramebufferId, FramebufferKind, PassState, RenderContext,
};
use crate::renderer::effects::RenderTarget;

/// Weighted-blended order-independent translucency.
///
/// Translucent draws accumulate into a floating-point target that depth
/// tests against the opaque framebuffer without writing depth. The resolve
/// pass composites the weighted average over the opaque color.
#[derive(Debug)]
pub struct OrderIndependentTranslucency {
    accumulation: RenderTarget,
    opaque: Option<FramebufferId>,
}

impl Default for OrderIndependentTranslucency {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderIndependentTranslucency {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accumulation: RenderTarget::new("OIT Accumulation"),
            opaque: None,
        }
    }

    #[must_use]
    pub fn is_supported(capabilities: ContextCapabilities) -> bool {
        capabilities.float_textures && capabilities.depth_texture
    }

    /// Binds accumulation to the depth of `opaque`.
    pub fn update(&mut self, context: &mut dyn RenderContext, opaque: FramebufferId) -> Result<()> {
        self.accumulation.ensure(
            context,
            FramebufferKind::Accumulation {
                depth_source: opaque,
            },
        )?;
        self.opaque = Some(opaque);
        Ok(())
    }

    pub fn clear(&self, context: &mut dyn RenderContext, pass_state: &PassState) -> Result<()> {
        if let Some(framebuffer) = self.accumulation.id() {
            let pass = PassState {
                framebuffer: Some(framebuffer),
                ..*pass_state
            };
            context.clear(&ClearCommand::color(Color::TRANSPARENT), &pass)?;
        }
        Ok(())
    }

    /// Pass state routing draws into the accumulation target.
    #[must_use]
    pub fn accumulation_pass(&self, pass_state: &PassState) -> PassState {
        PassState {
            framebuffer: self.accumulation.id(),
            ..*pass_state
        }
    }

    /// Resolves accumulated translucency over the opaque color into
    /// `destination`.
    pub fn execute(&self, context: &mut dyn RenderContext, destination: Option<FramebufferId>) -> Result<()> {
        if let (Some(opaque), Some(accumulation)) = (self.opaque, self.accumulation.id()) {
            context.resolve_translucency(opaque, accumulation, destination)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        self.accumulation.destroy(context);
        self.opaque = None;
    }
}
