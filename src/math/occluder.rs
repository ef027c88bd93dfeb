//! Horizon culling against a spherical occluding body.
//!
//! Everything beyond the horizon of the globe, as seen from the camera, is
//! hidden. The test is conservative: a volume is only reported hidden when
//! it lies entirely inside the cone of shadow cast by the occluder.

use glam::DVec3;

use crate::math::bounds::BoundingSphere;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occluder {
    position: DVec3,
    radius: f64,
    camera_position: DVec3,
    /// Distance from the camera to the horizon. `None` when the camera is
    /// inside the occluder.
    horizon_distance: Option<f64>,
}

impl Occluder {
    #[must_use]
    pub fn from_bounding_sphere(sphere: BoundingSphere, camera_position: DVec3) -> Self {
        let distance_squared = sphere.center.distance_squared(camera_position);
        let radius_squared = sphere.radius * sphere.radius;
        let horizon_distance =
            (radius_squared < distance_squared).then(|| (distance_squared - radius_squared).sqrt());

        Self {
            position: sphere.center,
            radius: sphere.radius,
            camera_position,
            horizon_distance,
        }
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn horizon_distance(&self) -> Option<f64> {
        self.horizon_distance
    }

    #[must_use]
    pub fn is_point_visible(&self, point: DVec3) -> bool {
        let Some(horizon) = self.horizon_distance else {
            return true;
        };
        let temp = point.distance_squared(self.position) - self.radius * self.radius;
        if temp <= 0.0 {
            return false;
        }
        let reach = temp.sqrt() + horizon;
        reach * reach > point.distance_squared(self.camera_position)
    }

    #[must_use]
    pub fn is_bounding_sphere_visible(&self, occludee: &BoundingSphere) -> bool {
        let Some(horizon) = self.horizon_distance else {
            return true;
        };

        let occludee_radius = occludee.radius;
        let radius_delta = self.radius - occludee_radius;
        let temp = occludee.center.distance_squared(self.position) - radius_delta * radius_delta;

        if occludee_radius < self.radius {
            if temp > 0.0 {
                let reach = temp.sqrt() + horizon;
                let to_camera = occludee.center.distance_squared(self.camera_position);
                return reach * reach + occludee_radius * occludee_radius > to_camera;
            }
            return false;
        }

        if temp > 0.0 {
            let to_camera = occludee.center.distance_squared(self.camera_position);
            let occluder_radius_sq = self.radius * self.radius;
            let occludee_radius_sq = occludee_radius * occludee_radius;
            // Close enough that the occluder cannot cover it.
            if (horizon * horizon + occluder_radius_sq) * occludee_radius_sq
                > to_camera * occluder_radius_sq
            {
                return true;
            }
            let reach = temp.sqrt() + horizon;
            return reach * reach + occludee_radius_sq > to_camera;
        }

        // The occludee encloses the occluder.
        true
    }

    #[inline]
    #[must_use]
    pub fn is_occluded(&self, occludee: &BoundingSphere) -> bool {
        !self.is_bounding_sphere_visible(occludee)
    }
}
