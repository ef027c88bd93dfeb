use glam::DVec3;

use crate::errors::Result;
use crate::renderer::command::{DrawCommand, RenderState};
use crate::renderer::context::{DrawMode, MeshData, MeshHandle, PassState, RenderContext};
use crate::renderer::pass::Pass;
use crate::scene::camera::Camera;

/// Depth-only quad at the globe's horizon plane.
///
/// Drawn after the ground-clamped pass when decorations are not depth tested
/// against terrain, so nothing on the far side of the globe can be seen or
/// picked through it.
#[derive(Debug, Default)]
pub struct DepthPlane {
    mesh: Option<MeshHandle>,
    command: Option<DrawCommand>,
}

impl DepthPlane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Corners of the horizon quad, or `None` when the camera is inside the
    /// globe.
    #[must_use]
    pub fn compute_depth_quad(camera_position: DVec3, center: DVec3, radius: f64) -> Option<[DVec3; 4]> {
        let q = (camera_position - center) / radius;
        let q_magnitude_sq = q.length_squared();
        if q_magnitude_sq <= 1.0 {
            return None;
        }
        let q_magnitude = q_magnitude_sq.sqrt();
        let q_unit = q / q_magnitude;

        // East and north at q; any perpendicular works at the poles.
        let east = DVec3::Z.cross(q);
        let east = if east.length_squared() > 1e-12 {
            east.normalize()
        } else {
            DVec3::X
        };
        let north = q_unit.cross(east).normalize();

        let limb = (q_magnitude_sq - 1.0).sqrt();
        let plane_center = q_unit / q_magnitude;
        let scalar = limb / q_magnitude;
        let east = east * scalar;
        let north = north * scalar;

        let to_world = |p: DVec3| center + p * radius;
        Some([
            to_world(plane_center - north - east),
            to_world(plane_center - north + east),
            to_world(plane_center + north + east),
            to_world(plane_center + north - east),
        ])
    }

    pub fn update(&mut self, context: &mut dyn RenderContext, camera: &Camera, center: DVec3, radius: f64) -> Result<()> {
        let Some(corners) = Self::compute_depth_quad(camera.position, center, radius) else {
            self.command = None;
            return Ok(());
        };
        let data = MeshData {
            positions: corners.to_vec(),
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        let mesh = match self.mesh {
            Some(mesh) => {
                context.update_mesh(mesh, data)?;
                mesh
            }
            None => {
                let mesh = context.create_mesh(data);
                self.mesh = Some(mesh);
                mesh
            }
        };
        self.command = Some(
            DrawCommand::new(Pass::Opaque, mesh)
                .with_label("Depth Plane")
                .with_cull(false)
                .with_render_state(RenderState::DEPTH_ONLY),
        );
        Ok(())
    }

    pub fn execute(&self, context: &mut dyn RenderContext, pass_state: &PassState) -> Result<()> {
        if let Some(command) = &self.command {
            context.draw(command, pass_state, DrawMode::Color { tint: None })?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some(mesh) = self.mesh.take() {
            context.destroy_mesh(mesh);
        }
        self.command = None;
    }
}
