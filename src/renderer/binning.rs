//! Visibility Culler / Binner
//!
//! Walks the frame's command list once, drops commands outside the culling
//! volume or behind the horizon, measures each survivor's distance interval
//! along the view direction and appends it to every sub-frustum it overlaps.
//!
//! The sub-frustums used while binning are last frame's. When the extent
//! measured this frame no longer fits them, the list is repartitioned and
//! binning runs a second time. There is never a third pass.

use log::{debug, trace};

use crate::math::{CullingVolume, Intersect, Interval, Occluder};
use crate::renderer::command::{Command, CommandList};
use crate::renderer::debug::FrustumStatistics;
use crate::renderer::frustum_commands::FrustumCommands;
use crate::renderer::partition::{FrustumPartitioner, FrustumPlan};
use crate::renderer::pass::Pass;
use crate::scene::camera::{Camera, FrustumProjection};

/// Inputs of one binning run.
#[derive(Debug, Clone, Copy)]
pub struct BinningInput<'a> {
    pub commands: &'a CommandList,
    /// Full camera (or pick) culling volume. The far plane is ignored.
    pub culling_volume: &'a CullingVolume,
    pub occluder: Option<&'a Occluder>,
    pub camera: &'a Camera,
    /// Record per-command frustum overlap masks and statistics.
    pub collect_statistics: bool,
}

/// Outcome of one binning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinningReport {
    /// Extent the sub-frustums were planned for.
    pub plan: FrustumPlan,
    /// Number of binning passes, 1 or 2.
    pub passes: u32,
    /// A non-clear command without bounds forced the camera range.
    pub unbounded: bool,
}

/// Whether a command survives culling. Commands without bounds or with
/// `cull` unset are always visible.
#[must_use]
pub fn is_visible(command: &Command, culling_volume: &CullingVolume, occluder: Option<&Occluder>) -> bool {
    let Some(volume) = command.bounding_volume() else {
        return true;
    };
    if !command.cull() {
        return true;
    }
    culling_volume.compute_visibility(volume) != Intersect::Outside
        && !occluder.is_some_and(|o| o.is_occluded(&volume.bounding_sphere()))
}

#[derive(Debug)]
pub struct CommandBinner {
    partitioner: FrustumPartitioner,
    frustums: Vec<FrustumCommands>,
    compute: Vec<u32>,
    overlay: Vec<u32>,
    overlap_masks: Vec<u32>,
    statistics: Option<FrustumStatistics>,
}

impl CommandBinner {
    #[must_use]
    pub fn new(far_to_near_ratio: f64) -> Self {
        Self {
            partitioner: FrustumPartitioner::new(far_to_near_ratio),
            frustums: Vec::new(),
            compute: Vec::new(),
            overlay: Vec::new(),
            overlap_masks: Vec::new(),
            statistics: None,
        }
    }

    #[must_use]
    pub fn partitioner(&self) -> &FrustumPartitioner {
        &self.partitioner
    }

    pub fn set_far_to_near_ratio(&mut self, ratio: f64) {
        self.partitioner.set_far_to_near_ratio(ratio);
    }

    /// Sub-frustums, nearest first.
    #[must_use]
    pub fn frustums(&self) -> &[FrustumCommands] {
        &self.frustums
    }

    /// Indices of commands in the compute side channel.
    #[must_use]
    pub fn compute_commands(&self) -> &[u32] {
        &self.compute
    }

    /// Indices of commands in the overlay side channel.
    #[must_use]
    pub fn overlay_commands(&self) -> &[u32] {
        &self.overlay
    }

    /// Bit `i` is set when command `index` was binned into sub-frustum `i`.
    /// Zero unless statistics were collected.
    #[must_use]
    pub fn overlap_mask(&self, index: u32) -> u32 {
        self.overlap_masks.get(index as usize).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn statistics(&self) -> Option<&FrustumStatistics> {
        self.statistics.as_ref()
    }

    /// Bins `input.commands`, repartitioning once if the measured extent
    /// does not fit the current sub-frustums.
    pub fn create_potentially_visible_set(&mut self, input: &BinningInput<'_>) -> BinningReport {
        let camera_near = input.camera.frustum.near();
        let camera_far = input.camera.frustum.far();
        let culling_volume = input.culling_volume.without_far_plane();

        let mut passes = 0;
        loop {
            passes += 1;
            let (extent, unbounded) = self.bin(input, &culling_volume);

            let extent = if unbounded {
                Some((camera_near, camera_far))
            } else {
                // Near within the camera range, far between near and the camera far.
                extent.map(|(near, far)| {
                    let near = near.max(camera_near).min(camera_far);
                    let far = far.min(camera_far).max(near);
                    (near, far)
                })
            };
            let plan = self.partitioner.plan(extent, camera_near, camera_far);

            if passes == 1 && FrustumPartitioner::needs_update(&plan, &self.frustums) {
                debug!(
                    "Repartitioning [{:.3}, {:.3}] into {} sub-frustums (was {})",
                    plan.near,
                    plan.far,
                    plan.count,
                    self.frustums.len()
                );
                self.partitioner.update(&plan, &mut self.frustums);
                continue;
            }

            trace!(
                "Binned {} commands into {} sub-frustums in {} pass(es)",
                input.commands.len(),
                self.frustums.len(),
                passes
            );
            return BinningReport {
                plan,
                passes,
                unbounded,
            };
        }
    }

    /// One binning pass against the current sub-frustums. Returns the
    /// extent of all visible bounded commands and whether an unbounded
    /// non-clear command was seen.
    fn bin(&mut self, input: &BinningInput<'_>, culling_volume: &CullingVolume) -> (Option<(f64, f64)>, bool) {
        for frustum in &mut self.frustums {
            frustum.clear();
        }
        self.compute.clear();
        self.overlay.clear();
        self.overlap_masks.clear();
        if input.collect_statistics {
            self.overlap_masks.resize(input.commands.len(), 0);
            self.statistics = Some(FrustumStatistics::default());
        } else {
            self.statistics = None;
        }

        let camera = input.camera;
        let mut near = f64::MAX;
        let mut far = f64::MIN;
        let mut unbounded = false;

        for (index, command) in input.commands.iter().enumerate() {
            let index = index as u32;
            match command.pass() {
                Pass::Compute => {
                    self.compute.push(index);
                    continue;
                }
                Pass::Overlay => {
                    self.overlay.push(index);
                    continue;
                }
                _ => {}
            }

            let distances = if let Some(volume) = command.bounding_volume() {
                if !is_visible(command, culling_volume, input.occluder) {
                    continue;
                }
                let distances = volume.compute_plane_distances(camera.position, camera.direction);
                near = near.min(distances.start);
                far = far.max(distances.stop);
                distances
            } else {
                if !command.is_clear() {
                    unbounded = true;
                }
                Interval::new(camera.frustum.near(), camera.frustum.far())
            };

            self.insert_into_bins(index, command, distances);
        }

        let extent = (near != f64::MAX).then_some((near, far));
        (extent, unbounded)
    }

    fn insert_into_bins(&mut self, index: u32, command: &Command, distances: Interval) {
        let pass = command.bin_pass();
        let mut mask = 0_u32;

        for (i, frustum) in self.frustums.iter_mut().enumerate() {
            if distances.start > frustum.far {
                continue;
            }
            if distances.stop < frustum.near {
                break;
            }

            frustum.push(pass, index);
            mask |= 1_u32.checked_shl(i as u32).unwrap_or(0);

            if command.execute_in_closest_frustum() {
                break;
            }
        }

        if let Some(stats) = &mut self.statistics {
            if let Some(slot) = self.overlap_masks.get_mut(index as usize) {
                *slot = mask;
            }
            stats.record(mask);
        }
    }
}
