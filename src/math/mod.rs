pub mod bounds;
pub mod color;
pub mod culling;
pub mod occluder;

pub use bounds::{BoundingBox, BoundingSphere, BoundingVolume, Interval};
pub use color::Color;
pub use culling::{CullingVolume, Intersect, Plane};
pub use occluder::Occluder;
