//! Scene Module
//!
//! The frame owner and its collaborators:
//! - Scene: drives render, pick, position and drill picking
//! - Camera: position, orientation and projection
//! - FrameState: per-frame context handed to content producers
//! - Primitive / Globe / SkyEffect: content producer interfaces
//! - Event: synchronous notifications

pub mod camera;
pub mod events;
pub mod frame_state;
pub mod mode;
pub mod primitive;
pub mod scene;

pub use camera::{
    Camera, FrustumProjection, OrthographicFrustum, PerspectiveFrustum, PerspectiveOffCenterFrustum,
    Projection,
};
pub use events::{CameraEvent, Event, ListenerId, RenderErrorEvent, RenderEvent};
pub use frame_state::{FramePasses, FrameState, MAX_FRAME_NUMBER};
pub use mode::SceneMode;
pub use primitive::{
    EffectCommands, Globe, Primitive, PrimitiveCollection, PrimitiveKey, PrimitiveUpdate, SkyEffect,
};
pub use scene::Scene;
