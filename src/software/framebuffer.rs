use glam::{UVec2, Vec4};

use crate::math::Color;
use crate::renderer::command::ClearCommand;
use crate::renderer::context::{FramebufferKind, Rectangle};

/// CPU storage behind one framebuffer. Rows are stored top to bottom.
#[derive(Debug, Clone)]
pub(crate) struct Framebuffer {
    pub label: &'static str,
    pub size: UVec2,
    pub kind: FramebufferKind,
    /// RGBA8 texels. Empty for accumulation targets.
    pub color: Vec<[u8; 4]>,
    /// Normalized depth, empty when the kind has no depth attachment.
    pub depth: Vec<f32>,
    /// Premultiplied, weighted color sum and weight (accumulation only).
    pub accumulation: Vec<Vec4>,
    /// Product of `1 - alpha` (accumulation only).
    pub revealage: Vec<f32>,
}

impl Framebuffer {
    pub fn new(label: &'static str, size: UVec2, kind: FramebufferKind) -> Self {
        let len = (size.x as usize) * (size.y as usize);
        let (color, depth, accumulation, revealage) = match kind {
            FramebufferKind::Color | FramebufferKind::PackedDepth => {
                (vec![[0; 4]; len], Vec::new(), Vec::new(), Vec::new())
            }
            FramebufferKind::ColorDepth => (vec![[0; 4]; len], vec![1.0; len], Vec::new(), Vec::new()),
            FramebufferKind::Accumulation { .. } => {
                (Vec::new(), Vec::new(), vec![Vec4::ZERO; len], vec![1.0; len])
            }
        };
        Self {
            label,
            size,
            kind,
            color,
            depth,
            accumulation,
            revealage,
        }
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.size.x as usize) + x as usize
    }

    pub fn is_accumulation(&self) -> bool {
        matches!(self.kind, FramebufferKind::Accumulation { .. })
    }

    /// Region of the framebuffer an operation may touch.
    pub fn bounds(&self, scissor: Option<Rectangle>) -> Rectangle {
        let full = Rectangle::new(0, 0, self.size.x, self.size.y);
        let Some(scissor) = scissor else {
            return full;
        };
        let x = scissor.x.min(full.width);
        let y = scissor.y.min(full.height);
        let right = scissor.x.saturating_add(scissor.width).min(full.width);
        let bottom = scissor.y.saturating_add(scissor.height).min(full.height);
        Rectangle::new(x, y, right - x, bottom - y)
    }

    pub fn clear(&mut self, command: &ClearCommand, scissor: Option<Rectangle>) {
        let bounds = self.bounds(scissor);
        let color = command.color.map(Color::to_bytes);
        let accumulate = self.is_accumulation();

        for y in bounds.y..bounds.y + bounds.height {
            for x in bounds.x..bounds.x + bounds.width {
                let index = self.index(x, y);
                if command.color.is_some() && accumulate {
                    self.accumulation[index] = Vec4::ZERO;
                    self.revealage[index] = 1.0;
                } else if let Some(color) = color {
                    self.color[index] = color;
                }
                if let (Some(depth), Some(texel)) = (command.depth, self.depth.get_mut(index)) {
                    *texel = depth;
                }
            }
        }
    }

    /// Copies `rectangle` as tightly packed RGBA8 rows.
    pub fn read(&self, rectangle: Rectangle) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((rectangle.width * rectangle.height * 4) as usize);
        for y in rectangle.y..rectangle.y + rectangle.height {
            let start = self.index(rectangle.x, y);
            let row = &self.color[start..start + rectangle.width as usize];
            pixels.extend_from_slice(bytemuck::cast_slice(row));
        }
        pixels
    }
}
