use glam::UVec2;

use crate::errors::Result;
use crate::picking::id::{PickId, PickRegistry, PickedObject};
use crate::renderer::context::{
    FramebufferDescriptor, FramebufferId, FramebufferKind, PassState, Rectangle, RenderContext,
};

/// Off-screen target that pick frames render into.
#[derive(Debug, Default)]
pub struct PickFramebuffer {
    framebuffer: Option<(FramebufferId, UVec2)>,
}

impl PickFramebuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures the framebuffer matches the drawing buffer and returns a pass
    /// state scissored to `rectangle`.
    pub fn begin(&mut self, context: &mut dyn RenderContext, rectangle: Rectangle) -> Result<PassState> {
        let size = context.drawing_buffer_size();
        let id = match self.framebuffer {
            Some((id, current)) if current == size => id,
            stale => {
                if let Some((id, _)) = stale {
                    context.destroy_framebuffer(id);
                }
                let id = context.create_framebuffer(&FramebufferDescriptor {
                    label: "Pick Framebuffer",
                    size,
                    kind: FramebufferKind::ColorDepth,
                })?;
                log::debug!("Created pick framebuffer {}x{}", size.x, size.y);
                self.framebuffer = Some((id, size));
                id
            }
        };

        Ok(PassState {
            framebuffer: Some(id),
            scissor: Some(rectangle),
        })
    }

    /// Reads back `rectangle` and returns the registered object closest to
    /// its center, walking outwards in a spiral.
    pub fn end(
        &mut self,
        context: &mut dyn RenderContext,
        rectangle: Rectangle,
        registry: &PickRegistry,
    ) -> Result<Option<PickedObject>> {
        let Some((id, _)) = self.framebuffer else {
            return Ok(None);
        };
        let pixels = context.read_pixels(rectangle, Some(id))?;

        let width = i64::from(rectangle.width);
        let height = i64::from(rectangle.height);
        let half_width = width / 2;
        let half_height = height / 2;
        let max = width.max(height);

        let (mut x, mut y) = (0_i64, 0_i64);
        let (mut dx, mut dy) = (0_i64, -1_i64);

        for _ in 0..max * max {
            if (-half_width..=half_width).contains(&x) && (-half_height..=half_height).contains(&y) {
                let index = (4 * ((half_height - y) * width + x + half_width)) as usize;
                if let Some(texel) = pixels.get(index..index + 4) {
                    let rgba = [texel[0], texel[1], texel[2], texel[3]];
                    if let Some(object) = PickId::from_rgba(rgba).and_then(|pick| registry.get(pick)) {
                        return Ok(Some(*object));
                    }
                }
            }

            // Turn at the corners of the spiral.
            if x == y || (x < 0 && -x == y) || (x > 0 && x == 1 - y) {
                (dx, dy) = (-dy, dx);
            }
            x += dx;
            y += dy;
        }

        Ok(None)
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some((id, _)) = self.framebuffer.take() {
            context.destroy_framebuffer(id);
        }
    }
}
