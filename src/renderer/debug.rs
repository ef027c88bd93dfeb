//! Debug Hooks
//!
//! Filtering and recoloring of executed commands, frustum statistics and
//! depth visualizers. None of this changes binning or pass order.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::math::Color;
use crate::renderer::command::{Command, DrawCommand};

/// Per-command strategy consulted by the pass executor.
pub trait CommandInspector {
    /// Commands for which this returns `false` are skipped.
    fn should_execute(&self, _command: &Command) -> bool {
        true
    }

    /// Color multiplied into a draw. `overlap_mask` has bit `i` set for each
    /// sub-frustum the command was binned into (zero unless frustum
    /// statistics are collected).
    fn tint(&self, _command: &DrawCommand, _overlap_mask: u32) -> Option<Color> {
        None
    }
}

type CommandFilter = Box<dyn Fn(&Command) -> bool>;

/// Built-in inspector: owner filter, per-owner colors and frustum overlap
/// colors.
#[derive(Default)]
pub struct DebugCommandInspector {
    /// Tint each command by a color derived from its owner.
    pub show_commands: bool,
    /// Tint by overlapped sub-frustums: red, green and blue for the first three.
    pub show_frustums: bool,
    filter: Option<CommandFilter>,
}

impl DebugCommandInspector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Fn(&Command) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn with_show_commands(mut self, show: bool) -> Self {
        self.show_commands = show;
        self
    }

    #[must_use]
    pub fn with_show_frustums(mut self, show: bool) -> Self {
        self.show_frustums = show;
        self
    }

    /// Stable pseudo-random color for `command`'s owner.
    #[must_use]
    pub fn owner_color(command: &DrawCommand) -> Color {
        let mut hasher = FxHasher::default();
        command.owner.hash(&mut hasher);
        command.label.hash(&mut hasher);
        let h = hasher.finish().to_le_bytes();
        // Keep channels away from black so the tint stays visible.
        let channel = |b: u8| 0.25 + f32::from(b) / 255.0 * 0.75;
        Color::new(channel(h[0]), channel(h[1]), channel(h[2]), 1.0)
    }

    #[must_use]
    pub fn frustum_color(overlap_mask: u32) -> Color {
        let bit = |i: u32| if overlap_mask & (1 << i) != 0 { 1.0 } else { 0.0 };
        Color::new(bit(0), bit(1), bit(2), 1.0)
    }
}

impl CommandInspector for DebugCommandInspector {
    fn should_execute(&self, command: &Command) -> bool {
        self.filter.as_ref().is_none_or(|f| f(command))
    }

    fn tint(&self, command: &DrawCommand, overlap_mask: u32) -> Option<Color> {
        let mut tint = None::<Color>;
        if self.show_commands {
            tint = Some(Self::owner_color(command));
        }
        if self.show_frustums {
            let frustum = Self::frustum_color(overlap_mask);
            tint = Some(tint.map_or(frustum, |t| t.multiply(frustum)));
        }
        tint
    }
}

/// Debug-only pipeline settings.
#[derive(Default)]
pub struct DebugSettings {
    pub inspector: Option<Box<dyn CommandInspector>>,
    /// Collect per-command overlap masks and [`FrustumStatistics`].
    pub show_frustums: bool,
    /// Capture each sub-frustum's ground pass into its own framebuffer and
    /// present the one selected by `show_depth_frustum`.
    pub show_globe_depth: bool,
    /// Present the packed pick depth of the selected sub-frustum.
    pub show_pick_depth: bool,
    /// 1-based sub-frustum index for the depth visualizers.
    pub show_depth_frustum: usize,
}

impl std::fmt::Debug for DebugSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSettings")
            .field("inspector", &self.inspector.is_some())
            .field("show_frustums", &self.show_frustums)
            .field("show_globe_depth", &self.show_globe_depth)
            .field("show_pick_depth", &self.show_pick_depth)
            .field("show_depth_frustum", &self.show_depth_frustum)
            .finish()
    }
}

/// How many commands overlapped each combination of sub-frustums.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrustumStatistics {
    pub total_commands: usize,
    /// Overlap mask to command count.
    pub commands_in_frustums: FxHashMap<u32, usize>,
}

impl FrustumStatistics {
    pub fn record(&mut self, overlap_mask: u32) {
        *self.commands_in_frustums.entry(overlap_mask).or_insert(0) += 1;
        self.total_commands += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frustum_color_maps_first_three_bits() {
        assert_eq!(DebugCommandInspector::frustum_color(0b101), Color::new(1.0, 0.0, 1.0, 1.0));
        assert_eq!(DebugCommandInspector::frustum_color(0b1000), Color::new(0.0, 0.0, 0.0, 1.0));
    }
}
