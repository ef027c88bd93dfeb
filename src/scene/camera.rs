use glam::{DMat4, DVec2, DVec3};

use crate::math::culling::{CullingVolume, Plane};

/// Shared capability surface of every projection kind.
///
/// The pipeline narrows a clone of the camera projection to each
/// sub-frustum's `[near, far]`, asks it for culling planes, and uses the
/// pixel size at a given distance to build the picking footprint.
pub trait FrustumProjection {
    fn near(&self) -> f64;
    fn far(&self) -> f64;
    fn set_near_far(&mut self, near: f64, far: f64);

    /// Planes ordered Left, Right, Bottom, Top, Near, Far. `direction` and
    /// `up` must be normalized and orthogonal.
    fn compute_culling_volume(&self, position: DVec3, direction: DVec3, up: DVec3)
    -> CullingVolume;

    /// World-space size of one pixel at `distance` from the eye.
    fn pixel_size(&self, width: u32, height: u32, distance: f64) -> DVec2;

    /// Right-handed projection mapping `[near, far]` to depth `[0, 1]`.
    fn projection_matrix(&self) -> DMat4;
}

// ============================================================================
// Perspective (off-center)
// ============================================================================

/// Perspective frustum described by its near-plane rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveOffCenterFrustum {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl PerspectiveOffCenterFrustum {
    #[must_use]
    pub fn new(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }
}

impl FrustumProjection for PerspectiveOffCenterFrustum {
    fn near(&self) -> f64 {
        self.near
    }

    fn far(&self) -> f64 {
        self.far
    }

    fn set_near_far(&mut self, near: f64, far: f64) {
        // The near rectangle scales with the near distance.
        let scale = near / self.near;
        self.left *= scale;
        self.right *= scale;
        self.bottom *= scale;
        self.top *= scale;
        self.near = near;
        self.far = far;
    }

    fn compute_culling_volume(
        &self,
        position: DVec3,
        direction: DVec3,
        up: DVec3,
    ) -> CullingVolume {
        let right = direction.cross(up);
        let near_center = position + direction * self.near;
        let far_center = position + direction * self.far;

        let edge = |offset: DVec3| (near_center + offset - position).normalize();

        let left_normal = edge(right * self.left).cross(up).normalize();
        let right_normal = up.cross(edge(right * self.right)).normalize();
        let bottom_normal = right.cross(edge(up * self.bottom)).normalize();
        let top_normal = edge(up * self.top).cross(right).normalize();

        CullingVolume::new([
            Plane::from_point_normal(position, left_normal),
            Plane::from_point_normal(position, right_normal),
            Plane::from_point_normal(position, bottom_normal),
            Plane::from_point_normal(position, top_normal),
            Plane::from_point_normal(near_center, direction),
            Plane::from_point_normal(far_center, -direction),
        ])
    }

    fn pixel_size(&self, width: u32, height: u32, distance: f64) -> DVec2 {
        let inverse_near = 1.0 / self.near;
        let tan_theta = (self.right - self.left) * 0.5 * inverse_near;
        let tan_phi = (self.top - self.bottom) * 0.5 * inverse_near;
        DVec2::new(
            2.0 * distance * tan_theta / f64::from(width.max(1)),
            2.0 * distance * tan_phi / f64::from(height.max(1)),
        )
    }

    fn projection_matrix(&self) -> DMat4 {
        let (l, r, b, t, n, f) = (
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        );
        DMat4::from_cols_array(&[
            2.0 * n / (r - l),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 * n / (t - b),
            0.0,
            0.0,
            (r + l) / (r - l),
            (t + b) / (t - b),
            f / (n - f),
            -1.0,
            0.0,
            0.0,
            n * f / (n - f),
            0.0,
        ])
    }
}

// ============================================================================
// Perspective (symmetric)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveFrustum {
    /// Vertical field of view in radians.
    pub fovy: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
}

impl PerspectiveFrustum {
    #[must_use]
    pub fn new(fovy: f64, aspect_ratio: f64, near: f64, far: f64) -> Self {
        Self {
            fovy,
            aspect_ratio,
            near,
            far,
        }
    }

    #[must_use]
    pub fn to_off_center(&self) -> PerspectiveOffCenterFrustum {
        let top = self.near * (self.fovy * 0.5).tan();
        let right = self.aspect_ratio * top;
        PerspectiveOffCenterFrustum::new(-right, right, -top, top, self.near, self.far)
    }
}

impl FrustumProjection for PerspectiveFrustum {
    fn near(&self) -> f64 {
        self.near
    }

    fn far(&self) -> f64 {
        self.far
    }

    fn set_near_far(&mut self, near: f64, far: f64) {
        self.near = near;
        self.far = far;
    }

    fn compute_culling_volume(
        &self,
        position: DVec3,
        direction: DVec3,
        up: DVec3,
    ) -> CullingVolume {
        self.to_off_center()
            .compute_culling_volume(position, direction, up)
    }

    fn pixel_size(&self, width: u32, height: u32, distance: f64) -> DVec2 {
        self.to_off_center().pixel_size(width, height, distance)
    }

    fn projection_matrix(&self) -> DMat4 {
        self.to_off_center().projection_matrix()
    }
}

// ============================================================================
// Orthographic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicFrustum {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl OrthographicFrustum {
    #[must_use]
    pub fn new(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }
}

impl FrustumProjection for OrthographicFrustum {
    fn near(&self) -> f64 {
        self.near
    }

    fn far(&self) -> f64 {
        self.far
    }

    fn set_near_far(&mut self, near: f64, far: f64) {
        self.near = near;
        self.far = far;
    }

    fn compute_culling_volume(
        &self,
        position: DVec3,
        direction: DVec3,
        up: DVec3,
    ) -> CullingVolume {
        let right = direction.cross(up);
        let near_center = position + direction * self.near;
        let far_center = position + direction * self.far;

        CullingVolume::new([
            Plane::from_point_normal(near_center + right * self.left, right),
            Plane::from_point_normal(near_center + right * self.right, -right),
            Plane::from_point_normal(near_center + up * self.bottom, up),
            Plane::from_point_normal(near_center + up * self.top, -up),
            Plane::from_point_normal(near_center, direction),
            Plane::from_point_normal(far_center, -direction),
        ])
    }

    fn pixel_size(&self, width: u32, height: u32, _distance: f64) -> DVec2 {
        DVec2::new(
            (self.right - self.left) / f64::from(width.max(1)),
            (self.top - self.bottom) / f64::from(height.max(1)),
        )
    }

    fn projection_matrix(&self) -> DMat4 {
        DMat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

// ============================================================================
// Projection (tagged variant)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveFrustum),
    PerspectiveOffCenter(PerspectiveOffCenterFrustum),
    Orthographic(OrthographicFrustum),
}

impl Projection {
    /// `fovy` in radians.
    #[must_use]
    pub fn perspective(fovy: f64, aspect_ratio: f64, near: f64, far: f64) -> Self {
        Self::Perspective(PerspectiveFrustum::new(fovy, aspect_ratio, near, far))
    }

    #[must_use]
    pub fn orthographic(width: f64, height: f64, near: f64, far: f64) -> Self {
        Self::Orthographic(OrthographicFrustum::new(
            -width * 0.5,
            width * 0.5,
            -height * 0.5,
            height * 0.5,
            near,
            far,
        ))
    }

    #[must_use]
    pub fn is_orthographic(&self) -> bool {
        matches!(self, Self::Orthographic(_))
    }

    fn as_dyn(&self) -> &dyn FrustumProjection {
        match self {
            Self::Perspective(p) => p,
            Self::PerspectiveOffCenter(p) => p,
            Self::Orthographic(o) => o,
        }
    }

    /// Copy of this projection narrowed to `[near, far]`.
    #[must_use]
    pub fn with_near_far(&self, near: f64, far: f64) -> Self {
        let mut narrowed = *self;
        narrowed.set_near_far(near, far);
        narrowed
    }
}

impl FrustumProjection for Projection {
    fn near(&self) -> f64 {
        self.as_dyn().near()
    }

    fn far(&self) -> f64 {
        self.as_dyn().far()
    }

    fn set_near_far(&mut self, near: f64, far: f64) {
        match self {
            Self::Perspective(p) => p.set_near_far(near, far),
            Self::PerspectiveOffCenter(p) => p.set_near_far(near, far),
            Self::Orthographic(o) => o.set_near_far(near, far),
        }
    }

    fn compute_culling_volume(
        &self,
        position: DVec3,
        direction: DVec3,
        up: DVec3,
    ) -> CullingVolume {
        self.as_dyn()
            .compute_culling_volume(position, direction, up)
    }

    fn pixel_size(&self, width: u32, height: u32, distance: f64) -> DVec2 {
        self.as_dyn().pixel_size(width, height, distance)
    }

    fn projection_matrix(&self) -> DMat4 {
        self.as_dyn().projection_matrix()
    }
}

// ============================================================================
// Camera
// ============================================================================

/// World-space camera: an orthonormal frame plus a projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: DVec3,
    pub direction: DVec3,
    pub up: DVec3,
    pub right: DVec3,
    pub frustum: Projection,
}

impl Camera {
    /// Camera at the origin looking down -Z with +Y up.
    #[must_use]
    pub fn new(frustum: Projection) -> Self {
        Self {
            position: DVec3::ZERO,
            direction: DVec3::NEG_Z,
            up: DVec3::Y,
            right: DVec3::X,
            frustum,
        }
    }

    /// Places the camera at `position` looking towards `target`.
    pub fn look_at(&mut self, position: DVec3, target: DVec3, up: DVec3) {
        self.set_view(position, target - position, up);
    }

    /// Sets position and orientation, re-orthonormalizing `up`.
    pub fn set_view(&mut self, position: DVec3, direction: DVec3, up: DVec3) {
        let direction = direction.normalize();
        let right = direction.cross(up).normalize();
        self.position = position;
        self.direction = direction;
        self.right = right;
        self.up = right.cross(direction);
    }

    #[must_use]
    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.position, self.position + self.direction, self.up)
    }

    #[must_use]
    pub fn culling_volume(&self) -> CullingVolume {
        self.frustum
            .compute_culling_volume(self.position, self.direction, self.up)
    }

    /// Compares two cameras component-wise. Positions are scaled by their
    /// largest component first so planetary coordinates compare relatively.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let scale = 1.0 / self.position.abs().max_element().max(other.position.abs().max_element()).max(1.0);
        (self.position * scale).abs_diff_eq(other.position * scale, epsilon)
            && self.direction.abs_diff_eq(other.direction, epsilon)
            && self.up.abs_diff_eq(other.up, epsilon)
            && self.right.abs_diff_eq(other.right, epsilon)
    }
}
