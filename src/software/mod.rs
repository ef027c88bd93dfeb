//! Software Render Context
//!
//! A CPU implementation of [`RenderContext`]: meshes and framebuffers live
//! in slot maps, draws are rasterized on the CPU with a depth test, blending
//! and scissoring, and every executed operation can be recorded in a
//! journal.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use glam::UVec2;
//! use stratum::software::SoftwareContext;
//!
//! let context = SoftwareContext::new(UVec2::new(320, 240)).with_journal();
//! let mut scene = Scene::new(context, camera, SceneSettings::default())?;
//! scene.render(Some(0.0))?;
//! for event in scene.context_mut().take_journal() {
//!     println!("{event:?}");
//! }
//! ```

mod filters;
mod framebuffer;
mod journal;
mod raster;

pub use journal::{ContextEvent, PRIMARY_LABEL};

use glam::{DMat4, DVec3, UVec2, Vec4};
use slotmap::SlotMap;

use crate::errors::{Result, StratumError};
use crate::math::Color;
use crate::picking::{PickId, pack_depth};
use crate::renderer::command::{ClearCommand, ComputeCommand, DrawCommand, RenderState};
use crate::renderer::context::{
    ContextCapabilities, DrawMode, FramebufferDescriptor, FramebufferId, FramebufferKind, MeshData,
    MeshHandle, PassState, PostEffect, Rectangle, RenderContext, ViewUniforms,
};

use self::framebuffer::Framebuffer;

fn target_mut<'a>(
    primary: &'a mut Framebuffer,
    framebuffers: &'a mut SlotMap<FramebufferId, Framebuffer>,
    id: Option<FramebufferId>,
) -> Result<&'a mut Framebuffer> {
    match id {
        None => Ok(primary),
        Some(id) => framebuffers
            .get_mut(id)
            .ok_or_else(|| StratumError::FramebufferMissing(format!("{id:?}"))),
    }
}

/// Writes `color`, alpha blending over the stored texel when `blend` is set.
fn write_color(texel: &mut [u8; 4], color: Color, blend: bool) {
    if !blend {
        *texel = color.to_bytes();
        return;
    }
    let dst = Color::from_bytes(*texel);
    let a = color.a;
    *texel = Color::new(
        color.r * a + dst.r * (1.0 - a),
        color.g * a + dst.g * (1.0 - a),
        color.b * a + dst.b * (1.0 - a),
        a + dst.a * (1.0 - a),
    )
    .to_bytes();
}

/// Weighted-blended OIT weight for a fragment at depth `z` with alpha `a`.
fn accumulation_weight(alpha: f32, z: f32) -> f32 {
    let d = 1.0 - z;
    (alpha * (3e3 * d * d * d).max(1e-2)).clamp(1e-2, 3e3)
}

#[derive(Debug)]
pub struct SoftwareContext {
    capabilities: ContextCapabilities,
    primary: Framebuffer,
    meshes: SlotMap<MeshHandle, MeshData>,
    framebuffers: SlotMap<FramebufferId, Framebuffer>,
    view: ViewUniforms,
    journal: Option<Vec<ContextEvent>>,
    frames: u64,
}

impl SoftwareContext {
    #[must_use]
    pub fn new(size: UVec2) -> Self {
        Self {
            capabilities: ContextCapabilities::default(),
            primary: Framebuffer::new(PRIMARY_LABEL, size, FramebufferKind::ColorDepth),
            meshes: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            view: ViewUniforms {
                view: DMat4::IDENTITY,
                projection: DMat4::IDENTITY,
                camera_position: DVec3::ZERO,
                near: 0.0,
                far: 1.0,
            },
            journal: None,
            frames: 0,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: ContextCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Records every executed operation.
    #[must_use]
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(Vec::new());
        self
    }

    #[must_use]
    pub fn journal(&self) -> &[ContextEvent] {
        self.journal.as_deref().unwrap_or_default()
    }

    pub fn take_journal(&mut self) -> Vec<ContextEvent> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Resizes the primary target. Auxiliary framebuffers follow on their
    /// next use.
    pub fn resize(&mut self, size: UVec2) {
        self.primary = Framebuffer::new(PRIMARY_LABEL, size, FramebufferKind::ColorDepth);
    }

    /// Texel of the primary target.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.primary.size.x || y >= self.primary.size.y {
            return None;
        }
        self.primary.color.get(self.primary.index(x, y)).copied()
    }

    #[must_use]
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of completed frames.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn record(&mut self, event: impl FnOnce() -> ContextEvent) {
        if let Some(journal) = &mut self.journal {
            journal.push(event());
        }
    }

    fn target(&self, id: Option<FramebufferId>) -> Result<&Framebuffer> {
        match id {
            None => Ok(&self.primary),
            Some(id) => self
                .framebuffers
                .get(id)
                .ok_or_else(|| StratumError::FramebufferMissing(format!("{id:?}"))),
        }
    }

    fn target_mut(&mut self, id: Option<FramebufferId>) -> Result<&mut Framebuffer> {
        target_mut(&mut self.primary, &mut self.framebuffers, id)
    }

    fn label(&self, id: Option<FramebufferId>) -> &'static str {
        self.target(id).map_or("<missing>", |f| f.label)
    }

    /// Writes `color` into `destination`, which must match the source size.
    fn write_color(&mut self, destination: Option<FramebufferId>, size: UVec2, color: Vec<[u8; 4]>) -> Result<()> {
        let target = self.target_mut(destination)?;
        if target.size != size || target.is_accumulation() {
            return Err(StratumError::Context(format!(
                "cannot write {}x{} color into {} ({}x{})",
                size.x, size.y, target.label, target.size.x, target.size.y
            )));
        }
        target.color = color;
        Ok(())
    }

    fn color_source(&self, source: FramebufferId) -> Result<(UVec2, Vec<[u8; 4]>)> {
        let source = self.target(Some(source))?;
        if source.is_accumulation() {
            return Err(StratumError::Unsupported(format!(
                "{} has no color attachment",
                source.label
            )));
        }
        Ok((source.size, source.color.clone()))
    }
}

impl RenderContext for SoftwareContext {
    fn drawing_buffer_size(&self) -> UVec2 {
        self.primary.size
    }

    fn capabilities(&self) -> ContextCapabilities {
        self.capabilities
    }

    // === Resources ===

    fn create_mesh(&mut self, data: MeshData) -> MeshHandle {
        self.meshes.insert(data)
    }

    fn update_mesh(&mut self, mesh: MeshHandle, data: MeshData) -> Result<()> {
        let slot = self
            .meshes
            .get_mut(mesh)
            .ok_or_else(|| StratumError::MeshMissing(format!("{mesh:?}")))?;
        *slot = data;
        Ok(())
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.remove(mesh);
    }

    fn create_framebuffer(&mut self, descriptor: &FramebufferDescriptor) -> Result<FramebufferId> {
        match descriptor.kind {
            FramebufferKind::Accumulation { depth_source } => {
                if !self.capabilities.float_textures {
                    return Err(StratumError::Unsupported(
                        "accumulation targets need floating-point textures".to_string(),
                    ));
                }
                let source = self.target(Some(depth_source))?;
                if source.depth.is_empty() {
                    return Err(StratumError::Unsupported(format!(
                        "{} has no depth attachment to share",
                        source.label
                    )));
                }
            }
            FramebufferKind::PackedDepth if !self.capabilities.depth_texture => {
                return Err(StratumError::Unsupported(
                    "packed depth targets need depth textures".to_string(),
                ));
            }
            _ => {}
        }
        Ok(self
            .framebuffers
            .insert(Framebuffer::new(descriptor.label, descriptor.size, descriptor.kind)))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(framebuffer);
    }

    fn framebuffer_size(&self, framebuffer: FramebufferId) -> Option<UVec2> {
        self.framebuffers.get(framebuffer).map(|f| f.size)
    }

    // === Commands ===

    fn set_view(&mut self, uniforms: &ViewUniforms) {
        self.view = *uniforms;
        self.record(|| ContextEvent::SetView {
            near: uniforms.near,
            far: uniforms.far,
        });
    }

    fn clear(&mut self, command: &ClearCommand, pass: &PassState) -> Result<()> {
        let target = self.target_mut(pass.framebuffer)?;
        target.clear(command, pass.scissor);
        let label = target.label;
        self.record(|| ContextEvent::Clear {
            target: label,
            color: command.color.is_some(),
            depth: command.depth.is_some(),
        });
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand, pass: &PassState, mode: DrawMode) -> Result<()> {
        let mesh = self
            .meshes
            .get(command.mesh)
            .ok_or_else(|| StratumError::MeshMissing(command.label.to_string()))?;
        let mvp = self.view.projection * self.view.view * command.model_matrix;

        // Accumulation depth-tests against its source without writing it.
        let depth_source = match self.target(pass.framebuffer)?.kind {
            FramebufferKind::Accumulation { depth_source } => Some(depth_source),
            _ => None,
        };
        if depth_source.is_some() && mode != DrawMode::TranslucentAccumulate {
            return Err(StratumError::Context(format!(
                "`{}` cannot draw color into an accumulation target",
                command.label
            )));
        }
        let mut depth = match depth_source {
            Some(source) => self
                .framebuffers
                .get_mut(source)
                .map(|f| std::mem::take(&mut f.depth))
                .ok_or_else(|| StratumError::FramebufferMissing(format!("{source:?}")))?,
            None => std::mem::take(&mut target_mut(&mut self.primary, &mut self.framebuffers, pass.framebuffer)?.depth),
        };

        let target = target_mut(&mut self.primary, &mut self.framebuffers, pass.framebuffer)?;
        let state = command.render_state;
        let depth_test = state.contains(RenderState::DEPTH_TEST);
        let depth_write = state.contains(RenderState::DEPTH_WRITE) && depth_source.is_none();
        let color_write = state.contains(RenderState::COLOR_WRITE);
        let blend = state.contains(RenderState::BLEND);
        let bounds = target.bounds(pass.scissor);
        let size = target.size;

        for triangle in mesh.indices.chunks_exact(3) {
            let vertex = |i: u32| mesh.positions.get(i as usize).copied();
            let (Some(a), Some(b), Some(c)) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2])) else {
                continue;
            };

            raster::rasterize_triangle([a, b, c], mvp, size, bounds, |x, y, z| {
                let index = target.index(x, y);
                if depth_test && depth.get(index).is_some_and(|&stored| z >= stored) {
                    return;
                }
                if depth_write {
                    if let Some(stored) = depth.get_mut(index) {
                        *stored = z;
                    }
                }
                if !color_write {
                    return;
                }

                match mode {
                    DrawMode::Pick => {
                        target.color[index] = command.pick_id.map_or([0; 4], PickId::to_rgba);
                    }
                    DrawMode::TranslucentAccumulate if target.is_accumulation() => {
                        let color = command.color;
                        let weight = accumulation_weight(color.a, z);
                        let premultiplied = Vec4::new(color.r * color.a, color.g * color.a, color.b * color.a, color.a);
                        target.accumulation[index] += premultiplied * weight;
                        target.revealage[index] *= 1.0 - color.a;
                    }
                    DrawMode::TranslucentAccumulate => {
                        write_color(&mut target.color[index], command.color, blend);
                    }
                    DrawMode::Color { tint } => {
                        let color = tint.map_or(command.color, |t| command.color.multiply(t));
                        write_color(&mut target.color[index], color, blend);
                    }
                }
            });
        }

        let label = target.label;
        match depth_source {
            Some(source) => {
                if let Some(framebuffer) = self.framebuffers.get_mut(source) {
                    framebuffer.depth = depth;
                }
            }
            None => target.depth = depth,
        }

        let (near, far) = (self.view.near, self.view.far);
        self.record(|| ContextEvent::Draw {
            label: command.label.to_string(),
            target: label,
            mode,
            near,
            far,
        });
        Ok(())
    }

    fn compute(&mut self, command: &ComputeCommand) -> Result<()> {
        if let Some(output) = command.output {
            self.target(Some(output))?;
        }
        self.record(|| ContextEvent::Compute {
            label: command.label.to_string(),
        });
        Ok(())
    }

    // === Copies & Post Effects ===

    fn copy_color(&mut self, source: FramebufferId, destination: Option<FramebufferId>) -> Result<()> {
        let (size, color) = self.color_source(source)?;
        self.write_color(destination, size, color)?;
        let (source, destination) = (self.label(Some(source)), self.label(destination));
        self.record(|| ContextEvent::CopyColor { source, destination });
        Ok(())
    }

    fn copy_packed_depth(&mut self, source: FramebufferId, destination: FramebufferId) -> Result<()> {
        let framebuffer = self.target(Some(source))?;
        if framebuffer.depth.is_empty() {
            return Err(StratumError::Unsupported(format!(
                "{} has no depth attachment",
                framebuffer.label
            )));
        }
        let size = framebuffer.size;
        let packed = framebuffer.depth.iter().map(|&d| pack_depth(f64::from(d))).collect();
        self.write_color(Some(destination), size, packed)?;
        let (source, destination) = (self.label(Some(source)), self.label(Some(destination)));
        self.record(|| ContextEvent::CopyPackedDepth { source, destination });
        Ok(())
    }

    fn resolve_translucency(
        &mut self,
        opaque: FramebufferId,
        accumulation: FramebufferId,
        destination: Option<FramebufferId>,
    ) -> Result<()> {
        let (size, opaque_color) = self.color_source(opaque)?;
        let accumulated = self.target(Some(accumulation))?;
        if !accumulated.is_accumulation() || accumulated.size != size {
            return Err(StratumError::Context(format!(
                "{} cannot be resolved over a {}x{} target",
                accumulated.label, size.x, size.y
            )));
        }
        let color = filters::resolve_translucency(&opaque_color, &accumulated.accumulation, &accumulated.revealage);
        self.write_color(destination, size, color)?;
        let destination = self.label(destination);
        self.record(|| ContextEvent::ResolveTranslucency { destination });
        Ok(())
    }

    fn post_process(
        &mut self,
        effect: PostEffect,
        source: FramebufferId,
        destination: Option<FramebufferId>,
    ) -> Result<()> {
        let (size, color) = self.color_source(source)?;
        let output = match effect {
            PostEffect::Fxaa => filters::fxaa(&color, size),
            PostEffect::SunBloom => filters::bloom(&color, size),
            PostEffect::DepthVisualization => filters::depth_visualization(&color),
        };
        self.write_color(destination, size, output)?;
        let destination = self.label(destination);
        self.record(|| ContextEvent::PostProcess { effect, destination });
        Ok(())
    }

    // === Readback ===

    fn read_pixels(&mut self, rectangle: Rectangle, framebuffer: Option<FramebufferId>) -> Result<Vec<u8>> {
        let target = self.target(framebuffer)?;
        let fits = rectangle.width > 0
            && rectangle.height > 0
            && rectangle.x.checked_add(rectangle.width).is_some_and(|r| r <= target.size.x)
            && rectangle.y.checked_add(rectangle.height).is_some_and(|b| b <= target.size.y);
        if !fits {
            return Err(StratumError::ReadbackOutOfBounds {
                x: rectangle.x,
                y: rectangle.y,
                width: rectangle.width,
                height: rectangle.height,
                fb_width: target.size.x,
                fb_height: target.size.y,
            });
        }
        if target.is_accumulation() {
            return Err(StratumError::Unsupported(format!(
                "{} cannot be read back",
                target.label
            )));
        }
        let pixels = target.read(rectangle);
        let source = target.label;
        self.record(|| ContextEvent::ReadPixels { source, rectangle });
        Ok(pixels)
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.record(|| ContextEvent::EndFrame);
    }
}
