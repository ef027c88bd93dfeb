//! Narrow culling volumes covering the picking footprint.

use glam::{DVec2, UVec2};

use crate::math::CullingVolume;
use crate::scene::camera::{
    Camera, FrustumProjection, OrthographicFrustum, PerspectiveOffCenterFrustum, Projection,
};

/// Off-center frustum through the `width`×`height` pixel footprint centered
/// on drawing-buffer pixel `position`.
#[must_use]
pub fn perspective_pick_volume(
    camera: &Camera,
    buffer_size: UVec2,
    position: DVec2,
    width: u32,
    height: u32,
) -> CullingVolume {
    let frustum = match camera.frustum {
        Projection::Perspective(p) => p.to_off_center(),
        Projection::PerspectiveOffCenter(p) => p,
        Projection::Orthographic(_) => {
            return orthographic_pick_volume(camera, buffer_size, position, width, height);
        }
    };

    let near = frustum.near;
    let buffer_width = f64::from(buffer_size.x.max(1));
    let buffer_height = f64::from(buffer_size.y.max(1));

    // Pixel center in normalized device coordinates, y up.
    let x = (2.0 / buffer_width) * (position.x.floor() + 0.5) - 1.0;
    let y = (2.0 / buffer_height) * (buffer_height - position.y.floor() - 0.5) - 1.0;

    let x_dir = frustum.left + (x + 1.0) * 0.5 * (frustum.right - frustum.left);
    let y_dir = frustum.bottom + (y + 1.0) * 0.5 * (frustum.top - frustum.bottom);

    let pixel_size = frustum.pixel_size(buffer_size.x, buffer_size.y, near);
    let pick_width = pixel_size.x * f64::from(width) * 0.5;
    let pick_height = pixel_size.y * f64::from(height) * 0.5;

    let off_center = PerspectiveOffCenterFrustum::new(
        x_dir - pick_width,
        x_dir + pick_width,
        y_dir - pick_height,
        y_dir + pick_height,
        near,
        frustum.far,
    );
    off_center.compute_culling_volume(camera.position, camera.direction, camera.up)
}

/// Thin box along the view direction through the footprint.
#[must_use]
pub fn orthographic_pick_volume(
    camera: &Camera,
    buffer_size: UVec2,
    position: DVec2,
    width: u32,
    height: u32,
) -> CullingVolume {
    let frustum = match camera.frustum {
        Projection::Orthographic(o) => o,
        Projection::Perspective(_) | Projection::PerspectiveOffCenter(_) => {
            return perspective_pick_volume(camera, buffer_size, position, width, height);
        }
    };

    let buffer_width = f64::from(buffer_size.x.max(1));
    let buffer_height = f64::from(buffer_size.y.max(1));

    let x = (2.0 / buffer_width) * (position.x.floor() + 0.5) - 1.0;
    let y = (2.0 / buffer_height) * (buffer_height - position.y.floor() - 0.5) - 1.0;
    let x = frustum.left + (x + 1.0) * 0.5 * (frustum.right - frustum.left);
    let y = frustum.bottom + (y + 1.0) * 0.5 * (frustum.top - frustum.bottom);

    let origin = camera.position + camera.right * x + camera.up * y;

    let pixel_size = frustum.pixel_size(buffer_size.x, buffer_size.y, frustum.near);
    let half_width = pixel_size.x * f64::from(width) * 0.5;
    let half_height = pixel_size.y * f64::from(height) * 0.5;

    let ortho = OrthographicFrustum::new(
        -half_width,
        half_width,
        -half_height,
        half_height,
        frustum.near,
        frustum.far,
    );
    ortho.compute_culling_volume(origin, camera.direction, camera.up)
}
