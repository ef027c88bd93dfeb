//! Content Producers
//!
//! Primitives, the globe and sky effects are external collaborators: each
//! frame they are asked, in a fixed order, to contribute commands given the
//! current [`FrameState`]. They must not hold on to the command list past
//! the call.

use glam::DVec3;
use slotmap::{SlotMap, new_key_type};

use crate::errors::Result;
use crate::picking::{InstanceId, PickRegistry};
use crate::renderer::command::{Command, CommandList, ComputeCommand, DrawCommand};
use crate::renderer::context::RenderContext;
use crate::scene::frame_state::FrameState;

new_key_type! {
    /// Stable handle to a primitive in a [`PrimitiveCollection`].
    pub struct PrimitiveKey;
}

/// Everything a producer may touch while contributing to a frame.
pub struct PrimitiveUpdate<'a> {
    /// Key of the primitive being updated, `None` for the globe.
    pub owner: Option<PrimitiveKey>,
    pub context: &'a mut dyn RenderContext,
    pub frame_state: &'a mut FrameState,
    pub commands: &'a mut CommandList,
    pub pick_ids: &'a mut PickRegistry,
}

impl PrimitiveUpdate<'_> {
    /// Appends a command, stamping it with the current owner when it has none.
    pub fn push(&mut self, command: impl Into<Command>) {
        let mut command = command.into();
        if let Some(owner) = self.owner {
            command.set_owner_if_unset(owner);
        }
        self.commands.push(command);
    }
}

pub trait Primitive {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()>;

    fn show(&self) -> bool;

    fn set_show(&mut self, show: bool);

    /// Hides or shows a single instance. Returns `false` when the primitive
    /// has no per-instance visibility, in which case callers fall back to
    /// [`Primitive::set_show`].
    fn set_instance_show(&mut self, _instance: InstanceId, _show: bool) -> bool {
        false
    }

    /// Releases context resources.
    fn destroy(&mut self, _context: &mut dyn RenderContext) {}
}

/// The central body: terrain producer and horizon occluder.
pub trait Globe {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()>;

    fn show(&self) -> bool {
        true
    }

    fn center(&self) -> DVec3 {
        DVec3::ZERO
    }

    /// Radius of the largest sphere fully inside the body.
    fn minimum_radius(&self) -> f64;

    /// Whether ground-clamped content is depth tested against the terrain.
    fn depth_test_against_terrain(&self) -> bool {
        false
    }

    fn destroy(&mut self, _context: &mut dyn RenderContext) {}
}

/// Commands produced by an environment effect.
#[derive(Debug, Clone)]
pub struct EffectCommands {
    pub draw: DrawCommand,
    /// Dispatched right before `draw` (the sun's glow texture, for example).
    pub compute: Option<ComputeCommand>,
}

impl From<DrawCommand> for EffectCommands {
    fn from(draw: DrawCommand) -> Self {
        Self {
            draw,
            compute: None,
        }
    }
}

/// Sky box, atmosphere, sun or moon. Rendered once per frame behind all
/// sub-frustums, never during picking.
pub trait SkyEffect {
    fn update(
        &mut self,
        context: &mut dyn RenderContext,
        frame_state: &FrameState,
    ) -> Result<Option<EffectCommands>>;

    fn destroy(&mut self, _context: &mut dyn RenderContext) {}
}

/// Ordered set of primitives. Update order is insertion order.
#[derive(Default)]
pub struct PrimitiveCollection {
    primitives: SlotMap<PrimitiveKey, Box<dyn Primitive>>,
    order: Vec<PrimitiveKey>,
}

impl PrimitiveCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, primitive: Box<dyn Primitive>) -> PrimitiveKey {
        let key = self.primitives.insert(primitive);
        self.order.push(key);
        key
    }

    pub fn remove(&mut self, key: PrimitiveKey) -> Option<Box<dyn Primitive>> {
        let removed = self.primitives.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, key: PrimitiveKey) -> Option<&dyn Primitive> {
        self.primitives.get(key).map(AsRef::as_ref)
    }

    pub fn get_mut(&mut self, key: PrimitiveKey) -> Option<&mut (dyn Primitive + 'static)> {
        self.primitives.get_mut(key).map(AsMut::as_mut)
    }

    #[must_use]
    pub fn contains(&self, key: PrimitiveKey) -> bool {
        self.primitives.contains_key(key)
    }

    /// Keys in update order.
    #[must_use]
    pub fn keys(&self) -> &[PrimitiveKey] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (PrimitiveKey, Box<dyn Primitive>)> + '_ {
        self.order.clear();
        self.primitives.drain()
    }
}

impl std::fmt::Debug for PrimitiveCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveCollection")
            .field("len", &self.order.len())
            .finish()
    }
}
