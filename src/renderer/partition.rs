//! Frustum Partitioner
//!
//! Splits `[near, far]` into sub-frustums whose far:near ratio stays within
//! a fixed bound so that one depth buffer keeps usable precision across
//! planetary distance ranges.
//!
//! ```text
//! K      = ceil(log(F / N) / log(R))
//! near_i = max(N, N * R^i)
//! far_i  = min(F, R * near_i)
//! ```

use crate::renderer::frustum_commands::FrustumCommands;

/// Tolerance on `log(F/N)/log(R)` so exact powers of `R` do not gain a
/// sliver frustum from rounding.
const COUNT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPartitioner {
    far_to_near_ratio: f64,
}

/// The near/far extent a frame's sub-frustums must cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPlan {
    pub near: f64,
    pub far: f64,
    pub count: usize,
}

impl FrustumPartitioner {
    #[must_use]
    pub fn new(far_to_near_ratio: f64) -> Self {
        Self { far_to_near_ratio }
    }

    #[must_use]
    pub fn far_to_near_ratio(&self) -> f64 {
        self.far_to_near_ratio
    }

    pub fn set_far_to_near_ratio(&mut self, ratio: f64) {
        self.far_to_near_ratio = ratio;
    }

    /// `ceil(log(far / near) / log(ratio))`. Zero when `near == far`.
    #[must_use]
    pub fn frustum_count(&self, near: f64, far: f64) -> usize {
        if near <= 0.0 || far <= near {
            return 0;
        }
        let k = (far / near).ln() / self.far_to_near_ratio.ln();
        (k - COUNT_EPSILON).ceil().max(1.0) as usize
    }

    /// Plans the partition of `[near, far]`.
    ///
    /// Degenerate extents (nothing bounded, or `near == far`) collapse to a
    /// single sub-frustum over the camera range.
    #[must_use]
    pub fn plan(&self, extent: Option<(f64, f64)>, camera_near: f64, camera_far: f64) -> FrustumPlan {
        let fallback = FrustumPlan {
            near: camera_near,
            far: camera_far,
            count: 1,
        };
        let Some((near, far)) = extent else {
            return fallback;
        };
        match self.frustum_count(near, far) {
            0 => fallback,
            count => FrustumPlan { near, far, count },
        }
    }

    /// Whether `list` fails to match `plan`: a different count, or an
    /// extent reaching outside the outermost sub-frustums.
    #[must_use]
    pub fn needs_update(plan: &FrustumPlan, list: &[FrustumCommands]) -> bool {
        match (list.first(), list.last()) {
            (Some(first), Some(last)) => {
                plan.count != list.len() || plan.near < first.near || plan.far > last.far
            }
            _ => true,
        }
    }

    /// Rewrites `list` in place to follow `plan`. Existing descriptors keep
    /// their identity and bin storage.
    pub fn update(&self, plan: &FrustumPlan, list: &mut Vec<FrustumCommands>) {
        list.truncate(plan.count);
        for i in 0..plan.count {
            let (near, far) = if plan.count == 1 {
                (plan.near, plan.far)
            } else {
                let near = plan.near.max(self.far_to_near_ratio.powi(i as i32) * plan.near);
                let far = if i + 1 == plan.count {
                    plan.far
                } else {
                    plan.far.min(self.far_to_near_ratio * near)
                };
                (near, far)
            };

            match list.get_mut(i) {
                Some(frustum) => {
                    frustum.near = near;
                    frustum.far = far;
                }
                None => list.push(FrustumCommands::new(near, far)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_power_of_ratio_is_not_rounded_up() {
        let p = FrustumPartitioner::new(1000.0);
        assert_eq!(p.frustum_count(1.0, 1.0e6), 2);
        assert_eq!(p.frustum_count(1.0, 1.0e6 + 1.0), 3);
        assert_eq!(p.frustum_count(5.0, 5.0), 0);
    }
}
