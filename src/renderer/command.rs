//! Per-frame GPU operations.
//!
//! Content producers push [`Command`]s into a [`CommandList`] during update.
//! The list is cleared and refilled every frame; bins refer to commands by
//! their index into it.

use std::borrow::Cow;

use bitflags::bitflags;
use glam::{DMat4, UVec3};

use crate::math::{BoundingVolume, Color};
use crate::picking::PickId;
use crate::renderer::context::{FramebufferId, MeshHandle};
use crate::renderer::pass::Pass;
use crate::scene::primitive::PrimitiveKey;

pub type CommandList = Vec<Command>;

bitflags! {
    /// Fixed-function state of a draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderState: u8 {
        const DEPTH_TEST  = 1 << 0;
        const DEPTH_WRITE = 1 << 1;
        const COLOR_WRITE = 1 << 2;
        const BLEND       = 1 << 3;
    }
}

impl RenderState {
    pub const OPAQUE: Self = Self::DEPTH_TEST
        .union(Self::DEPTH_WRITE)
        .union(Self::COLOR_WRITE);
    pub const TRANSLUCENT: Self = Self::DEPTH_TEST
        .union(Self::COLOR_WRITE)
        .union(Self::BLEND);
    pub const DEPTH_ONLY: Self = Self::DEPTH_TEST.union(Self::DEPTH_WRITE);
}

impl Default for RenderState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

// ============================================================================
// Draw
// ============================================================================

#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub label: Cow<'static, str>,
    pub pass: Pass,
    /// World-space bounds. `None` means the extent is unknown.
    pub bounding_volume: Option<BoundingVolume>,
    /// Whether the command takes part in visibility testing.
    pub cull: bool,
    /// Bin only into the nearest overlapping sub-frustum.
    pub execute_in_closest_frustum: bool,
    pub owner: Option<PrimitiveKey>,
    pub mesh: MeshHandle,
    pub model_matrix: DMat4,
    pub color: Color,
    /// Identifier written instead of `color` during picking.
    pub pick_id: Option<PickId>,
    pub render_state: RenderState,
}

impl DrawCommand {
    #[must_use]
    pub fn new(pass: Pass, mesh: MeshHandle) -> Self {
        let render_state = if pass == Pass::Translucent {
            RenderState::TRANSLUCENT
        } else {
            RenderState::OPAQUE
        };
        Self {
            label: Cow::Borrowed("DrawCommand"),
            pass,
            bounding_volume: None,
            cull: true,
            execute_in_closest_frustum: false,
            owner: None,
            mesh,
            model_matrix: DMat4::IDENTITY,
            color: Color::WHITE,
            pick_id: None,
            render_state,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_bounding_volume(mut self, volume: impl Into<BoundingVolume>) -> Self {
        self.bounding_volume = Some(volume.into());
        self
    }

    #[must_use]
    pub fn with_cull(mut self, cull: bool) -> Self {
        self.cull = cull;
        self
    }

    #[must_use]
    pub fn with_closest_frustum_only(mut self, closest: bool) -> Self {
        self.execute_in_closest_frustum = closest;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: PrimitiveKey) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn with_model_matrix(mut self, model_matrix: DMat4) -> Self {
        self.model_matrix = model_matrix;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_pick_id(mut self, pick_id: PickId) -> Self {
        self.pick_id = Some(pick_id);
        self
    }

    #[must_use]
    pub fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }
}

// ============================================================================
// Clear
// ============================================================================

/// Clears the active framebuffer. Clears carry no bounding volume and belong
/// to every sub-frustum.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearCommand {
    pub color: Option<Color>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
    pub owner: Option<PrimitiveKey>,
    /// Only [`Pass::Compute`] and [`Pass::Overlay`] change routing; any other
    /// value bins the clear into the ground-surface pass.
    pub pass: Pass,
}

impl ClearCommand {
    #[must_use]
    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
            stencil: Some(0),
            owner: None,
            pass: Pass::Globe,
        }
    }

    #[must_use]
    pub fn depth() -> Self {
        Self {
            color: None,
            depth: Some(1.0),
            stencil: Some(0),
            owner: None,
            pass: Pass::Globe,
        }
    }
}

// ============================================================================
// Compute
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeCommand {
    pub label: Cow<'static, str>,
    pub owner: Option<PrimitiveKey>,
    pub workgroups: UVec3,
    /// Texture written by the dispatch, if any.
    pub output: Option<FramebufferId>,
}

impl ComputeCommand {
    #[must_use]
    pub fn new(label: impl Into<Cow<'static, str>>, workgroups: UVec3) -> Self {
        Self {
            label: label.into(),
            owner: None,
            workgroups,
            output: None,
        }
    }
}

// ============================================================================
// Command
// ============================================================================

#[derive(Debug, Clone)]
pub enum Command {
    Draw(DrawCommand),
    Clear(ClearCommand),
    Compute(ComputeCommand),
}

impl Command {
    #[must_use]
    pub fn pass(&self) -> Pass {
        match self {
            Self::Draw(d) => d.pass,
            Self::Clear(c) => c.pass,
            Self::Compute(_) => Pass::Compute,
        }
    }

    /// Pass whose bin receives this command.
    #[must_use]
    pub fn bin_pass(&self) -> Pass {
        match self {
            Self::Clear(_) => Pass::Globe,
            _ => self.pass(),
        }
    }

    #[must_use]
    pub fn bounding_volume(&self) -> Option<&BoundingVolume> {
        match self {
            Self::Draw(d) => d.bounding_volume.as_ref(),
            Self::Clear(_) | Self::Compute(_) => None,
        }
    }

    #[must_use]
    pub fn cull(&self) -> bool {
        match self {
            Self::Draw(d) => d.cull,
            Self::Clear(_) | Self::Compute(_) => false,
        }
    }

    #[must_use]
    pub fn execute_in_closest_frustum(&self) -> bool {
        match self {
            Self::Draw(d) => d.execute_in_closest_frustum,
            Self::Clear(_) | Self::Compute(_) => false,
        }
    }

    #[must_use]
    pub fn owner(&self) -> Option<PrimitiveKey> {
        match self {
            Self::Draw(d) => d.owner,
            Self::Clear(c) => c.owner,
            Self::Compute(c) => c.owner,
        }
    }

    pub fn set_owner_if_unset(&mut self, owner: PrimitiveKey) {
        let slot = match self {
            Self::Draw(d) => &mut d.owner,
            Self::Clear(c) => &mut c.owner,
            Self::Compute(c) => &mut c.owner,
        };
        if slot.is_none() {
            *slot = Some(owner);
        }
    }

    #[inline]
    #[must_use]
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Clear(_))
    }

    #[must_use]
    pub fn as_draw(&self) -> Option<&DrawCommand> {
        match self {
            Self::Draw(d) => Some(d),
            _ => None,
        }
    }
}

impl From<DrawCommand> for Command {
    fn from(cmd: DrawCommand) -> Self {
        Self::Draw(cmd)
    }
}

impl From<ClearCommand> for Command {
    fn from(cmd: ClearCommand) -> Self {
        Self::Clear(cmd)
    }
}

impl From<ComputeCommand> for Command {
    fn from(cmd: ComputeCommand) -> Self {
        Self::Compute(cmd)
    }
}
