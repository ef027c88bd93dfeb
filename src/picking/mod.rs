//! Picking
//!
//! Picking reruns culling and binning with a culling volume narrowed to a
//! small pixel footprint, renders object ids instead of colors into an
//! off-screen framebuffer, and decodes the texel under the cursor.
//!
//! Position picking reads the per-sub-frustum packed depth snapshots taken
//! during the last render and unprojects the first valid depth.

pub mod depth;
pub mod framebuffer;
pub mod id;
pub mod volume;

pub use depth::{PACKED_DEPTH_SCALE, pack_depth, unpack_depth, unproject};
pub use framebuffer::PickFramebuffer;
pub use id::{InstanceId, PickId, PickRegistry, PickedObject};
pub use volume::{orthographic_pick_volume, perspective_pick_volume};
