//! Graphics Context Seam
//!
//! [`RenderContext`] is everything the pipeline needs from a graphics API:
//! resource creation, clears, draws, depth and color copies, post effects and
//! pixel readback. The pipeline never talks to a device directly.
//!
//! Framebuffers are addressed by [`FramebufferId`]; `None` in a
//! [`PassState`] or as a copy destination means the primary (presented)
//! target. Window and framebuffer coordinates have their origin at the top
//! left, `y` growing downwards.

use glam::{DMat4, DVec3, UVec2};
use slotmap::new_key_type;

use crate::errors::Result;
use crate::math::Color;
use crate::renderer::command::{ClearCommand, ComputeCommand, DrawCommand};

new_key_type! {
    /// Handle to geometry uploaded to the context.
    pub struct MeshHandle;
    /// Handle to an off-screen framebuffer.
    pub struct FramebufferId;
}

/// Pixel rectangle in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextCapabilities {
    /// Depth attachments can be sampled, required for depth capture and
    /// position picking.
    pub depth_texture: bool,
    /// Floating-point color attachments, required for order-independent
    /// translucency.
    pub float_textures: bool,
}

impl Default for ContextCapabilities {
    fn default() -> Self {
        Self {
            depth_texture: true,
            float_textures: true,
        }
    }
}

/// Triangle list in model space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<DVec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned quad in the plane `z`, facing +Z.
    #[must_use]
    pub fn quad(min_x: f64, min_y: f64, max_x: f64, max_y: f64, z: f64) -> Self {
        Self {
            positions: vec![
                DVec3::new(min_x, min_y, z),
                DVec3::new(max_x, min_y, z),
                DVec3::new(max_x, max_y, z),
                DVec3::new(min_x, max_y, z),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferKind {
    /// RGBA8 color only.
    Color,
    /// RGBA8 color with a depth attachment.
    ColorDepth,
    /// Weighted-blended translucency accumulation. Depth testing reads the
    /// depth attachment of `depth_source` without writing it.
    Accumulation { depth_source: FramebufferId },
    /// RGBA8 target holding depth packed into four bytes.
    PackedDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub label: &'static str,
    pub size: UVec2,
    pub kind: FramebufferKind,
}

/// Matrices of the sub-frustum currently being executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewUniforms {
    pub view: DMat4,
    pub projection: DMat4,
    pub camera_position: DVec3,
    pub near: f64,
    pub far: f64,
}

/// How a draw writes its fragments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawMode {
    /// Shade with the command color, optionally multiplied by a debug tint.
    Color { tint: Option<Color> },
    /// Write the command's pick id, or zero when it has none.
    Pick,
    /// Accumulate into a translucency framebuffer.
    TranslucentAccumulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEffect {
    Fxaa,
    SunBloom,
    /// Grayscale view of a packed depth target.
    DepthVisualization,
}

/// Target and scissor for the next operations.
///
/// Reset at the start of every frame so that a failed frame cannot leak its
/// bindings into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassState {
    pub framebuffer: Option<FramebufferId>,
    pub scissor: Option<Rectangle>,
}

impl PassState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The graphics context the pipeline renders through.
pub trait RenderContext {
    fn drawing_buffer_size(&self) -> UVec2;

    fn capabilities(&self) -> ContextCapabilities;

    // === Resources ===

    fn create_mesh(&mut self, data: MeshData) -> MeshHandle;
    fn update_mesh(&mut self, mesh: MeshHandle, data: MeshData) -> Result<()>;
    fn destroy_mesh(&mut self, mesh: MeshHandle);

    fn create_framebuffer(&mut self, descriptor: &FramebufferDescriptor) -> Result<FramebufferId>;
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId);
    fn framebuffer_size(&self, framebuffer: FramebufferId) -> Option<UVec2>;

    // === Commands ===

    fn set_view(&mut self, uniforms: &ViewUniforms);
    fn clear(&mut self, command: &ClearCommand, pass: &PassState) -> Result<()>;
    fn draw(&mut self, command: &DrawCommand, pass: &PassState, mode: DrawMode) -> Result<()>;
    fn compute(&mut self, command: &ComputeCommand) -> Result<()>;

    // === Copies & Post Effects ===

    fn copy_color(&mut self, source: FramebufferId, destination: Option<FramebufferId>)
    -> Result<()>;
    /// Copies depth from `source` into the packed RGBA8 target `destination`.
    fn copy_packed_depth(&mut self, source: FramebufferId, destination: FramebufferId)
    -> Result<()>;
    /// Composites `accumulation` over the opaque color of `opaque`.
    fn resolve_translucency(
        &mut self,
        opaque: FramebufferId,
        accumulation: FramebufferId,
        destination: Option<FramebufferId>,
    ) -> Result<()>;
    fn post_process(
        &mut self,
        effect: PostEffect,
        source: FramebufferId,
        destination: Option<FramebufferId>,
    ) -> Result<()>;

    // === Readback ===

    /// Reads RGBA8 texels, row by row from the top of `rectangle`. Blocks
    /// until all submitted work touching the framebuffer has completed.
    fn read_pixels(&mut self, rectangle: Rectangle, framebuffer: Option<FramebufferId>)
    -> Result<Vec<u8>>;

    fn end_frame(&mut self);
}
