//! Frame Context
//!
//! A snapshot of everything that stays constant while a frame is culled,
//! binned and executed: camera and culling volume, horizon occluder, time,
//! viewing mode and which passes (render or pick) are active.

use bitflags::bitflags;
use glam::UVec2;

use crate::math::{CullingVolume, Occluder};
use crate::scene::camera::Camera;
use crate::scene::mode::SceneMode;

/// Frame numbers wrap back to 1 after this value.
pub const MAX_FRAME_NUMBER: u64 = 15_000_000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FramePasses: u8 {
        const RENDER = 1 << 0;
        const PICK   = 1 << 1;
    }
}

/// Callback run once after the current frame completes.
pub type AfterRenderFn = Box<dyn FnOnce()>;

pub struct FrameState {
    pub frame_number: u64,
    /// Seconds, as supplied to `Scene::render`.
    pub time: f64,
    pub mode: SceneMode,
    pub camera: Camera,
    pub culling_volume: CullingVolume,
    /// Present only in [`SceneMode::Scene3D`] with a globe.
    pub occluder: Option<Occluder>,
    pub passes: FramePasses,
    pub drawing_buffer_size: UVec2,
    after_render: Vec<AfterRenderFn>,
}

impl FrameState {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            frame_number: 0,
            time: 0.0,
            mode: SceneMode::default(),
            culling_volume: camera.culling_volume(),
            camera,
            occluder: None,
            passes: FramePasses::empty(),
            drawing_buffer_size: UVec2::ZERO,
            after_render: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_picking(&self) -> bool {
        self.passes.contains(FramePasses::PICK)
    }

    #[inline]
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.passes.contains(FramePasses::RENDER)
    }

    /// Queues `f` to run after the frame. Use this for changes to scene
    /// state that must not happen mid-frame.
    pub fn after_render(&mut self, f: impl FnOnce() + 'static) {
        self.after_render.push(Box::new(f));
    }

    pub(crate) fn run_after_render(&mut self) {
        for f in self.after_render.drain(..) {
            f();
        }
    }
}

impl std::fmt::Debug for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameState")
            .field("frame_number", &self.frame_number)
            .field("time", &self.time)
            .field("mode", &self.mode)
            .field("passes", &self.passes)
            .field("drawing_buffer_size", &self.drawing_buffer_size)
            .field("after_render", &self.after_render.len())
            .finish_non_exhaustive()
    }
}

/// Next frame number, wrapping to 1.
#[must_use]
pub fn next_frame_number(current: u64) -> u64 {
    if current >= MAX_FRAME_NUMBER {
        1
    } else {
        current + 1
    }
}
