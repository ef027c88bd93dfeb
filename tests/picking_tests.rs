//! Picking Tests
//!
//! Tests for:
//! - Object picking through the pick framebuffer
//! - Pick footprint search around the cursor
//! - Drill picking order, limits and visibility restoration
//! - World position reconstruction from captured depth
//! - Precondition errors

mod common;

use glam::{DVec2, DVec3};

use stratum::errors::StratumError;
use stratum::picking::PickedObject;
use stratum::renderer::context::ContextCapabilities;
use stratum::renderer::{PickRectangle, SceneSettings};
use stratum::scene::camera::{Camera, Projection};
use stratum::scene::SceneMode;
use stratum::software::ContextEvent;

use common::{CENTER, Quad, QuadStack};

fn approx(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

// ============================================================================
// Pick
// ============================================================================

#[test]
fn pick_returns_object_under_cursor() -> anyhow::Result<()> {
    let mut scene = common::scene();
    let key = scene.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    let picked = scene.pick(CENTER)?;
    assert_eq!(
        picked,
        Some(PickedObject {
            primitive: key,
            instance: None
        })
    );
    Ok(())
}

#[test]
fn pick_beside_object_returns_none() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    // The quad covers pixels 29..=34.
    assert!(scene.pick(CENTER + DVec2::new(5.0, 0.0))?.is_none());
    Ok(())
}

#[test]
fn pick_outside_drawing_buffer_returns_none() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    assert!(scene.pick(DVec2::new(-3.0, 10.0))?.is_none());
    assert!(scene.pick(DVec2::new(10.0, 64.0))?.is_none());
    Ok(())
}

#[test]
fn pick_returns_nearest_of_overlapping_objects() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("back", 20.0, 1.0).boxed());
    let front = scene.add_primitive(Quad::opaque("front", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(scene.pick(CENTER)?.map(|p| p.primitive), Some(front));
    Ok(())
}

#[test]
fn pick_ignores_objects_without_pick_id() -> anyhow::Result<()> {
    let mut scene = common::scene();
    let mut decoration = Quad::opaque("decoration", 10.0, 0.5);
    decoration.pickable = false;
    scene.add_primitive(decoration.boxed());
    scene.render(Some(0.0))?;

    assert!(scene.pick(CENTER)?.is_none());
    Ok(())
}

#[test]
fn wider_pick_rectangle_finds_nearby_object() -> anyhow::Result<()> {
    let beside = DVec2::new(35.5, 32.5);

    let mut narrow = common::scene();
    narrow.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    narrow.render(Some(0.0))?;
    assert!(narrow.pick(beside)?.is_none());

    let mut wide = common::scene_with(SceneSettings {
        pick_rectangle: PickRectangle {
            width: 3,
            height: 3,
        },
        ..common::settings()
    });
    let key = wide.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    wide.render(Some(0.0))?;
    assert_eq!(wide.pick(beside)?.map(|p| p.primitive), Some(key));
    Ok(())
}

#[test]
fn pick_reuses_frame_number_and_renders_offscreen() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("target", 10.0, 0.5).boxed());
    scene.render(Some(2.5))?;
    let frame = scene.frame_state().frame_number;
    let before = scene.context().pixel(32, 32);
    scene.context_mut().take_journal();

    scene.pick(CENTER)?;
    assert_eq!(scene.frame_state().frame_number, frame);
    assert_eq!(scene.frame_state().time, 2.5);
    assert_eq!(scene.context().pixel(32, 32), before);

    let journal = scene.context().journal();
    assert!(journal.iter().any(|e| matches!(e, ContextEvent::ReadPixels { source: "Pick Framebuffer", .. })));
    assert!(!journal.iter().any(|e| matches!(e, ContextEvent::PostProcess { .. })));
    Ok(())
}

#[test]
fn pick_in_2d_uses_orthographic_footprint() -> anyhow::Result<()> {
    let camera = Camera::new(Projection::orthographic(6.4, 6.4, 1.0, 100.0));
    let mut scene = stratum::Scene::new(common::context(), camera, common::settings())?;
    scene.set_mode(SceneMode::Scene2D)?;
    let key = scene.add_primitive(Quad::opaque("tile", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    // 0.1 world units per pixel: the tile covers pixels 27..37.
    assert_eq!(scene.pick(CENTER)?.map(|p| p.primitive), Some(key));
    assert!(scene.pick(DVec2::new(40.5, 32.5))?.is_none());
    Ok(())
}

// ============================================================================
// Drill Pick
// ============================================================================

#[test]
fn drill_pick_returns_front_to_back_and_restores_visibility() -> anyhow::Result<()> {
    let mut scene = common::scene();
    let a = scene.add_primitive(Quad::opaque("a", 10.0, 0.5).boxed());
    let b = scene.add_primitive(Quad::opaque("b", 20.0, 1.0).boxed());
    let c = scene.add_primitive(Quad::opaque("c", 30.0, 1.5).boxed());
    scene.render(Some(0.0))?;

    let all = scene.drill_pick(CENTER, None)?;
    let keys: Vec<_> = all.iter().map(|p| p.primitive).collect();
    assert_eq!(keys, vec![a, b, c]);

    for key in [a, b, c] {
        assert!(scene.primitives().get(key).is_some_and(|p| p.show()));
    }
    Ok(())
}

#[test]
fn drill_pick_stops_at_limit() -> anyhow::Result<()> {
    let mut scene = common::scene();
    let a = scene.add_primitive(Quad::opaque("a", 10.0, 0.5).boxed());
    let b = scene.add_primitive(Quad::opaque("b", 20.0, 1.0).boxed());
    let c = scene.add_primitive(Quad::opaque("c", 30.0, 1.5).boxed());
    scene.render(Some(0.0))?;

    let hits = scene.drill_pick(CENTER, Some(2))?;
    assert_eq!(hits.iter().map(|p| p.primitive).collect::<Vec<_>>(), vec![a, b]);
    assert!(scene.primitives().get(c).is_some_and(|p| p.show()));
    Ok(())
}

#[test]
fn drill_pick_with_zero_limit_is_empty() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("a", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;
    scene.context_mut().take_journal();

    assert!(scene.drill_pick(CENTER, Some(0))?.is_empty());
    assert!(scene.context().journal().is_empty());
    Ok(())
}

#[test]
fn drill_pick_on_empty_space_is_empty() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("a", 10.0, 0.5).boxed());
    scene.render(Some(0.0))?;
    assert!(scene.drill_pick(DVec2::new(2.5, 2.5), None)?.is_empty());
    Ok(())
}

#[test]
fn drill_pick_hides_instances_individually() -> anyhow::Result<()> {
    let mut scene = common::scene();
    let key = scene.add_primitive(Box::new(QuadStack::new(vec![10.0, 20.0, 30.0])));
    scene.render(Some(0.0))?;

    let hits = scene.drill_pick(CENTER, None)?;
    let instances: Vec<_> = hits.iter().map(|p| (p.primitive, p.instance)).collect();
    assert_eq!(
        instances,
        vec![(key, Some(0)), (key, Some(1)), (key, Some(2))]
    );

    // Every instance is visible again.
    assert_eq!(scene.pick(CENTER)?.and_then(|p| p.instance), Some(0));
    Ok(())
}

// ============================================================================
// Pick Position
// ============================================================================

#[test]
fn pick_position_reconstructs_surface_point() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;
    assert!(scene.pick_position_supported());

    let position = scene.pick_position(CENTER)?.expect("depth under cursor");

    // Pixel center (32.5, 32.5) is half a pixel off the axis.
    let offset = (32.5 / 64.0 * 2.0 - 1.0) * 10.0 * 30_f64.to_radians().tan();
    let expected = DVec3::new(offset, -offset, -10.0);
    assert!(
        position.abs_diff_eq(expected, 1e-3),
        "got {position}, expected {expected}"
    );
    Ok(())
}

#[test]
fn pick_position_searches_nearest_frustum_first() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("near", 10.0, 1.0).boxed());
    // Fills the view, so it is the only surface at the edge.
    scene.add_primitive(Quad::opaque("far", 50_000.0, 30_000.0).boxed());
    scene.render(Some(0.0))?;
    assert_eq!(scene.number_of_frustums(), 2);

    let near = scene.pick_position(CENTER)?.expect("near surface");
    assert!(approx(near.z, -10.0, 1e-3), "got {near}");

    let beside = scene.pick_position(DVec2::new(60.5, 32.5))?.expect("far surface");
    assert!(approx(beside.z, -50_000.0, 50.0), "got {beside}");
    Ok(())
}

#[test]
fn pick_position_over_background_is_none() -> anyhow::Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;
    assert!(scene.pick_position(DVec2::new(1.5, 1.5))?.is_none());
    Ok(())
}

#[test]
fn pick_position_requires_depth_textures() -> anyhow::Result<()> {
    let context = common::context().with_capabilities(ContextCapabilities {
        depth_texture: false,
        float_textures: false,
    });
    let mut scene = stratum::Scene::new(context, common::camera(), common::settings())?;
    scene.render(Some(0.0))?;

    assert!(!scene.pick_position_supported());
    assert!(matches!(
        scene.pick_position(CENTER),
        Err(StratumError::PickPositionUnsupported)
    ));
    Ok(())
}

#[test]
fn pick_position_rejects_orthographic_views() -> anyhow::Result<()> {
    let camera = Camera::new(Projection::orthographic(10.0, 10.0, 1.0, 100.0));
    let mut scene = stratum::Scene::new(common::context(), camera, common::settings())?;
    scene.render(Some(0.0))?;
    assert!(matches!(
        scene.pick_position(CENTER),
        Err(StratumError::OrthographicPickPosition)
    ));

    let mut flat = common::scene();
    flat.set_mode(SceneMode::Scene2D)?;
    flat.render(Some(0.0))?;
    assert!(matches!(
        flat.pick_position(CENTER),
        Err(StratumError::OrthographicPickPosition)
    ));
    Ok(())
}

#[test]
fn non_finite_window_position_is_rejected() {
    let mut scene = common::scene();
    assert!(matches!(
        scene.pick(DVec2::new(f64::NAN, 1.0)),
        Err(StratumError::InvalidArgument { .. })
    ));
    assert!(matches!(
        scene.pick_position(DVec2::new(1.0, f64::INFINITY)),
        Err(StratumError::InvalidArgument { .. })
    ));
}
