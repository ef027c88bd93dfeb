//! Frame Pipeline
//!
//! Culling, binning and execution of per-frame commands:
//!
//! - [`partition`]: splits `[near, far]` into sub-frustums of bounded
//!   far-to-near ratio
//! - [`binning`]: visibility culling and per-frustum, per-pass bins
//! - [`executor`]: frustum-ordered pass execution with translucency,
//!   anti-aliasing and depth capture
//! - [`context`]: the graphics context seam everything renders through

pub mod binning;
pub mod command;
pub mod context;
pub mod debug;
pub mod effects;
pub mod executor;
pub mod frustum_commands;
pub mod partition;
pub mod pass;
pub mod settings;

pub use binning::{BinningInput, BinningReport, CommandBinner};
pub use command::{ClearCommand, Command, CommandList, ComputeCommand, DrawCommand, RenderState};
pub use context::{
    ContextCapabilities, DrawMode, FramebufferDescriptor, FramebufferId, FramebufferKind, MeshData,
    MeshHandle, PassState, PostEffect, Rectangle, RenderContext, ViewUniforms,
};
pub use debug::{CommandInspector, DebugCommandInspector, DebugSettings, FrustumStatistics};
pub use executor::{ExecuteFrame, FrameEnvironment, GlobeInfo, PassExecutor};
pub use frustum_commands::FrustumCommands;
pub use partition::{FrustumPartitioner, FrustumPlan};
pub use pass::Pass;
pub use settings::{PickRectangle, SceneSettings};
