//! Bounding Volumes
//!
//! World-space bounding volumes attached to draw commands. Every volume can
//! answer two questions the pipeline asks each frame:
//!
//! - Which side of a plane is it on ([`BoundingVolume::intersect_plane`])
//! - What distance range does it cover along a view direction
//!   ([`BoundingVolume::compute_plane_distances`])

use glam::DVec3;

use crate::math::culling::{Intersect, Plane};

/// A closed distance range `[start, stop]` along a direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interval {
    pub start: f64,
    pub stop: f64,
}

impl Interval {
    #[must_use]
    pub const fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// Returns `true` when the two closed ranges share at least one point.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, near: f64, far: f64) -> bool {
        self.start <= far && self.stop >= near
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    #[must_use]
    pub const fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    #[must_use]
    pub fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance = plane.signed_distance(self.center);
        if distance < -self.radius {
            Intersect::Outside
        } else if distance < self.radius {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    /// Distance range covered by the sphere along `direction`, measured from
    /// `position`. `direction` must be normalized.
    #[must_use]
    pub fn compute_plane_distances(&self, position: DVec3, direction: DVec3) -> Interval {
        let mid = direction.dot(self.center - position);
        Interval::new(mid - self.radius, mid + self.radius)
    }
}

/// Axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    #[must_use]
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// Projected half-size of the box onto `direction`.
    fn projected_radius(&self, direction: DVec3) -> f64 {
        direction.abs().dot(self.half_extents())
    }

    #[must_use]
    pub fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance = plane.signed_distance(self.center());
        let radius = self.projected_radius(plane.normal);
        if distance + radius < 0.0 {
            Intersect::Outside
        } else if distance - radius < 0.0 {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    #[must_use]
    pub fn compute_plane_distances(&self, position: DVec3, direction: DVec3) -> Interval {
        let mid = direction.dot(self.center() - position);
        let radius = self.projected_radius(direction);
        Interval::new(mid - radius, mid + radius)
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.center(), self.half_extents().length())
    }
}

/// The bounding volume variants a command may carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    Sphere(BoundingSphere),
    Box(BoundingBox),
}

impl BoundingVolume {
    #[must_use]
    pub fn sphere(center: DVec3, radius: f64) -> Self {
        Self::Sphere(BoundingSphere::new(center, radius))
    }

    #[must_use]
    pub fn aabb(min: DVec3, max: DVec3) -> Self {
        Self::Box(BoundingBox::new(min, max))
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        match self {
            Self::Sphere(s) => s.center,
            Self::Box(b) => b.center(),
        }
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> BoundingSphere {
        match self {
            Self::Sphere(s) => *s,
            Self::Box(b) => b.bounding_sphere(),
        }
    }

    #[must_use]
    pub fn intersect_plane(&self, plane: &Plane) -> Intersect {
        match self {
            Self::Sphere(s) => s.intersect_plane(plane),
            Self::Box(b) => b.intersect_plane(plane),
        }
    }

    #[must_use]
    pub fn compute_plane_distances(&self, position: DVec3, direction: DVec3) -> Interval {
        match self {
            Self::Sphere(s) => s.compute_plane_distances(position, direction),
            Self::Box(b) => b.compute_plane_distances(position, direction),
        }
    }

    /// Squared distance from `point` to the volume's center. Used as the
    /// back-to-front sort key for translucent commands.
    #[inline]
    #[must_use]
    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        self.center().distance_squared(point)
    }
}

impl From<BoundingSphere> for BoundingVolume {
    fn from(sphere: BoundingSphere) -> Self {
        Self::Sphere(sphere)
    }
}

impl From<BoundingBox> for BoundingVolume {
    fn from(aabb: BoundingBox) -> Self {
        Self::Box(aabb)
    }
}
