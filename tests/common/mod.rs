//! Shared fixtures for the integration tests.
//!
//! The default view is a 64x64 drawing buffer seen through a 60° camera at
//! the origin looking down -Z, so a quad centered on the axis covers the
//! middle pixels.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use glam::{DMat4, DVec3, UVec2};

use stratum::errors::Result;
use stratum::math::{BoundingVolume, Color};
use stratum::picking::{InstanceId, PickId, PickedObject};
use stratum::renderer::context::{MeshData, MeshHandle, RenderContext};
use stratum::renderer::settings::SceneSettings;
use stratum::renderer::{DrawCommand, Pass};
use stratum::scene::camera::{Camera, Projection};
use stratum::scene::primitive::{EffectCommands, Globe, Primitive, PrimitiveUpdate, SkyEffect};
use stratum::scene::{FrameState, Scene};
use stratum::software::SoftwareContext;

pub const SIZE: u32 = 64;
pub const CENTER: glam::DVec2 = glam::DVec2::new(32.5, 32.5);

pub fn camera() -> Camera {
    Camera::new(Projection::perspective(60_f64.to_radians(), 1.0, 1.0, 1.0e6))
}

pub fn context() -> SoftwareContext {
    SoftwareContext::new(UVec2::splat(SIZE)).with_journal()
}

/// Defaults without FXAA, so colors can be compared exactly.
pub fn settings() -> SceneSettings {
    SceneSettings {
        fxaa: false,
        ..SceneSettings::default()
    }
}

/// Routes `log` output through the test harness. Run with `RUST_LOG=trace`
/// to see per-frame binning.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn scene() -> Scene<SoftwareContext> {
    scene_with(settings())
}

pub fn scene_with(settings: SceneSettings) -> Scene<SoftwareContext> {
    init_logging();
    Scene::new(context(), camera(), settings).expect("valid settings")
}

// ============================================================================
// Quad primitive
// ============================================================================

/// Axis-aligned square facing the camera at `center`.
pub struct Quad {
    pub label: &'static str,
    pub center: DVec3,
    pub half_size: f64,
    pub color: Color,
    pub pass: Pass,
    pub show: bool,
    pub pickable: bool,
    pub bounded: bool,
    pub closest_frustum_only: bool,
    mesh: Option<MeshHandle>,
    pick_id: Option<PickId>,
}

impl Quad {
    pub fn opaque(label: &'static str, distance: f64, half_size: f64) -> Self {
        Self {
            label,
            center: DVec3::new(0.0, 0.0, -distance),
            half_size,
            color: Color::WHITE,
            pass: Pass::Opaque,
            show: true,
            pickable: true,
            bounded: true,
            closest_frustum_only: false,
            mesh: None,
            pick_id: None,
        }
    }

    pub fn translucent(label: &'static str, distance: f64, half_size: f64, color: Color) -> Self {
        Self {
            color,
            pass: Pass::Translucent,
            ..Self::opaque(label, distance, half_size)
        }
    }

    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.pass = pass;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.bounded = false;
        self
    }

    pub fn boxed(self) -> Box<dyn Primitive> {
        Box::new(self)
    }
}

impl Primitive for Quad {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        let h = self.half_size;
        let mesh = *self
            .mesh
            .get_or_insert_with(|| update.context.create_mesh(MeshData::quad(-h, -h, h, h, 0.0)));

        if self.pickable && self.pick_id.is_none() {
            if let Some(owner) = update.owner {
                self.pick_id = Some(update.pick_ids.allocate(PickedObject {
                    primitive: owner,
                    instance: None,
                }));
            }
        }

        let mut command = DrawCommand::new(self.pass, mesh)
            .with_label(self.label)
            .with_model_matrix(DMat4::from_translation(self.center))
            .with_color(self.color)
            .with_closest_frustum_only(self.closest_frustum_only);
        if self.bounded {
            command = command.with_bounding_volume(BoundingVolume::sphere(
                self.center,
                h * std::f64::consts::SQRT_2,
            ));
        }
        if let Some(id) = self.pick_id {
            command = command.with_pick_id(id);
        }
        update.push(command);
        Ok(())
    }

    fn show(&self) -> bool {
        self.show
    }

    fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some(mesh) = self.mesh.take() {
            context.destroy_mesh(mesh);
        }
    }
}

// ============================================================================
// Instanced quads
// ============================================================================

/// Stack of quads sharing one primitive, each with its own pick id and
/// visibility.
pub struct QuadStack {
    pub distances: Vec<f64>,
    pub shown: Vec<bool>,
    mesh: Option<MeshHandle>,
    pick_ids: Vec<PickId>,
}

impl QuadStack {
    pub fn new(distances: Vec<f64>) -> Self {
        Self {
            shown: vec![true; distances.len()],
            distances,
            mesh: None,
            pick_ids: Vec::new(),
        }
    }
}

impl Primitive for QuadStack {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        let mesh = *self
            .mesh
            .get_or_insert_with(|| update.context.create_mesh(MeshData::quad(-0.5, -0.5, 0.5, 0.5, 0.0)));
        if self.pick_ids.is_empty() {
            if let Some(owner) = update.owner {
                for instance in 0..self.distances.len() {
                    self.pick_ids.push(update.pick_ids.allocate(PickedObject {
                        primitive: owner,
                        instance: Some(instance as InstanceId),
                    }));
                }
            }
        }

        for (i, &distance) in self.distances.iter().enumerate() {
            if !self.shown[i] {
                continue;
            }
            let center = DVec3::new(0.0, 0.0, -distance);
            let mut command = DrawCommand::new(Pass::Opaque, mesh)
                .with_label("stack")
                .with_model_matrix(DMat4::from_translation(center))
                .with_bounding_volume(BoundingVolume::sphere(center, 1.0));
            if let Some(&id) = self.pick_ids.get(i) {
                command = command.with_pick_id(id);
            }
            update.push(command);
        }
        Ok(())
    }

    fn show(&self) -> bool {
        true
    }

    fn set_show(&mut self, _show: bool) {}

    fn set_instance_show(&mut self, instance: InstanceId, show: bool) -> bool {
        match self.shown.get_mut(instance as usize) {
            Some(shown) => {
                *shown = show;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Other producers
// ============================================================================

/// Queues an after-render callback on every update.
pub struct AfterRenderProbe {
    pub calls: Rc<Cell<u32>>,
}

impl Primitive for AfterRenderProbe {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        let calls = Rc::clone(&self.calls);
        update.frame_state.after_render(move || calls.set(calls.get() + 1));
        Ok(())
    }

    fn show(&self) -> bool {
        true
    }

    fn set_show(&mut self, _show: bool) {}
}

/// Pushes a draw referencing a mesh that was never created.
pub struct BrokenPrimitive;

impl Primitive for BrokenPrimitive {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        update.push(DrawCommand::new(Pass::Opaque, MeshHandle::default()).with_label("broken"));
        Ok(())
    }

    fn show(&self) -> bool {
        true
    }

    fn set_show(&mut self, _show: bool) {}
}

/// Sphere-shaped body far below the camera with a terrain tile facing it.
pub struct TestGlobe {
    pub center: DVec3,
    pub radius: f64,
    pub depth_test_against_terrain: bool,
    mesh: Option<MeshHandle>,
}

impl TestGlobe {
    pub fn new() -> Self {
        Self {
            center: DVec3::new(0.0, 0.0, -1.0e7),
            radius: 6.0e6,
            depth_test_against_terrain: false,
            mesh: None,
        }
    }
}

impl Globe for TestGlobe {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        let mesh = *self
            .mesh
            .get_or_insert_with(|| update.context.create_mesh(MeshData::quad(-50.0, -50.0, 50.0, 50.0, 0.0)));
        let center = DVec3::new(0.0, 0.0, -500.0);
        update.push(
            DrawCommand::new(Pass::Globe, mesh)
                .with_label("terrain")
                .with_model_matrix(DMat4::from_translation(center))
                .with_color(Color::new(0.0, 0.0, 1.0, 1.0))
                .with_bounding_volume(BoundingVolume::sphere(center, 75.0)),
        );
        Ok(())
    }

    fn center(&self) -> DVec3 {
        self.center
    }

    fn minimum_radius(&self) -> f64 {
        self.radius
    }

    fn depth_test_against_terrain(&self) -> bool {
        self.depth_test_against_terrain
    }

    fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some(mesh) = self.mesh.take() {
            context.destroy_mesh(mesh);
        }
    }
}

/// Sky effect drawing a bright quad far away.
pub struct TestSun {
    mesh: Option<MeshHandle>,
}

impl TestSun {
    pub fn new() -> Self {
        Self { mesh: None }
    }
}

impl SkyEffect for TestSun {
    fn update(&mut self, context: &mut dyn RenderContext, _frame_state: &FrameState) -> Result<Option<EffectCommands>> {
        let mesh = *self
            .mesh
            .get_or_insert_with(|| context.create_mesh(MeshData::quad(-1000.0, -1000.0, 1000.0, 1000.0, 0.0)));
        let draw = DrawCommand::new(Pass::Opaque, mesh)
            .with_label("sun")
            .with_cull(false)
            .with_model_matrix(DMat4::from_translation(DVec3::new(0.0, 0.0, -9.0e5)));
        Ok(Some(draw.into()))
    }

    fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some(mesh) = self.mesh.take() {
            context.destroy_mesh(mesh);
        }
    }
}
