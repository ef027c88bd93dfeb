//! Plane-based culling volumes.

use glam::{DVec3, DVec4};
use smallvec::SmallVec;

use crate::math::bounds::BoundingVolume;

/// Result of testing a volume against a plane or a set of planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersect {
    Outside,
    Intersecting,
    Inside,
}

/// A plane in Hessian normal form: points `p` with `normal · p + distance = 0`.
/// The normal points towards the inside of the volume it bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    #[must_use]
    pub const fn new(normal: DVec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` facing `normal` (normalized).
    #[must_use]
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }

    #[must_use]
    pub fn as_vec4(&self) -> DVec4 {
        self.normal.extend(self.distance)
    }
}

/// Ordered plane set: Left, Right, Bottom, Top, Near, Far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullingVolume {
    pub planes: SmallVec<[Plane; 6]>,
}

impl CullingVolume {
    #[must_use]
    pub fn new(planes: impl IntoIterator<Item = Plane>) -> Self {
        Self {
            planes: planes.into_iter().collect(),
        }
    }

    /// Copy of this volume without its far plane. The far extent of a frame
    /// comes from the binned content, not from the camera.
    #[must_use]
    pub fn without_far_plane(&self) -> Self {
        Self {
            planes: self.planes.iter().take(5).copied().collect(),
        }
    }

    #[must_use]
    pub fn compute_visibility(&self, volume: &BoundingVolume) -> Intersect {
        let mut intersecting = false;
        for plane in &self.planes {
            match volume.intersect_plane(plane) {
                Intersect::Outside => return Intersect::Outside,
                Intersect::Intersecting => intersecting = true,
                Intersect::Inside => {}
            }
        }
        if intersecting {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }
}
