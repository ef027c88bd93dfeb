#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod math;
pub mod picking;
pub mod renderer;
pub mod scene;
pub mod software;

pub use errors::{Result, StratumError};
pub use math::{BoundingBox, BoundingSphere, BoundingVolume, Color, CullingVolume, Occluder};
pub use picking::{PickId, PickedObject};
pub use renderer::{Command, DrawCommand, Pass, RenderContext, SceneSettings};
pub use scene::{Camera, Primitive, Projection, Scene, SceneMode};
pub use software::SoftwareContext;
