//! Pass Executor Tests
//!
//! Tests for:
//! - Sub-frustum order and the opaque near-plane nudge
//! - Back-to-front sorting of translucent commands
//! - Order-independent translucency accumulate and resolve
//! - FXAA, globe depth copy and final composition
//! - Pick depth snapshots
//! - Ground pass, depth plane and sun bloom
//! - Compute/overlay side channels and debug inspection

mod common;

use glam::{DVec2, UVec2, UVec3};

use stratum::errors::Result;
use stratum::math::Color;
use stratum::renderer::context::{ContextCapabilities, DrawMode, PostEffect};
use stratum::renderer::executor::OPAQUE_FRUSTUM_NEAR_OFFSET;
use stratum::renderer::{Command, ComputeCommand, DebugCommandInspector, Pass, SceneSettings};
use stratum::scene::primitive::{Primitive, PrimitiveUpdate};
use stratum::software::{ContextEvent, SoftwareContext};

use common::{Quad, TestGlobe, TestSun};

const RED_HALF: Color = Color::new(1.0, 0.0, 0.0, 0.5);

fn draws(scene: &stratum::Scene<SoftwareContext>) -> Vec<(String, &'static str, DrawMode, f64, f64)> {
    scene
        .context()
        .journal()
        .iter()
        .filter_map(|event| match event {
            ContextEvent::Draw {
                label,
                target,
                mode,
                near,
                far,
            } => Some((label.clone(), *target, *mode, *near, *far)),
            _ => None,
        })
        .collect()
}

fn draw_labels(scene: &stratum::Scene<SoftwareContext>) -> Vec<String> {
    draws(scene).into_iter().map(|(label, ..)| label).collect()
}

fn has_event(scene: &stratum::Scene<SoftwareContext>, event: &ContextEvent) -> bool {
    scene.context().journal().contains(event)
}

fn without_oit() -> SceneSettings {
    SceneSettings {
        order_independent_translucency: false,
        ..common::settings()
    }
}

// ============================================================================
// Sub-frustum order
// ============================================================================

#[test]
fn frustums_execute_far_to_near() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("near", 10.0, 0.5).boxed());
    scene.add_primitive(Quad::opaque("far", 50_000.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(scene.number_of_frustums(), 2);
    assert_eq!(draw_labels(&scene), vec!["far", "near"]);
    Ok(())
}

#[test]
fn opaque_near_is_nudged_except_in_nearest_frustum() -> Result<()> {
    let mut scene = scene_without_oit();
    scene.add_primitive(Quad::opaque("near", 10.0, 0.5).boxed());
    scene.add_primitive(Quad::opaque("far", 50_000.0, 0.5).boxed());
    scene.add_primitive(Quad::translucent("far glass", 50_000.0, 0.5, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    let (near_0, far_0) = scene.frustum_near_far(0).expect("nearest frustum");
    let (near_1, far_1) = scene.frustum_near_far(1).expect("far frustum");
    let draws = draws(&scene);

    let far = draws.iter().find(|d| d.0 == "far").expect("far drawn");
    assert!((far.3 - near_1 * OPAQUE_FRUSTUM_NEAR_OFFSET).abs() < 1e-9);
    assert_eq!(far.4, far_1);

    // Translucent geometry uses the exact slice.
    let glass = draws.iter().find(|d| d.0 == "far glass").expect("glass drawn");
    assert_eq!((glass.3, glass.4), (near_1, far_1));

    let near = draws.iter().find(|d| d.0 == "near").expect("near drawn");
    assert_eq!((near.3, near.4), (near_0, far_0));
    Ok(())
}

fn scene_without_oit() -> stratum::Scene<SoftwareContext> {
    common::scene_with(without_oit())
}

// ============================================================================
// Translucency
// ============================================================================

#[test]
fn translucent_commands_sort_back_to_front() -> Result<()> {
    let mut scene = scene_without_oit();
    scene.add_primitive(Quad::translucent("d1", 10.0, 1.0, RED_HALF).boxed());
    scene.add_primitive(Quad::translucent("d3", 30.0, 1.0, RED_HALF).boxed());
    scene.add_primitive(Quad::translucent("d2", 20.0, 1.0, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(scene.number_of_frustums(), 1);
    assert_eq!(draw_labels(&scene), vec!["d3", "d2", "d1"]);
    Ok(())
}

#[test]
fn unbounded_translucent_command_sorts_first() -> Result<()> {
    let mut scene = scene_without_oit();
    scene.add_primitive(Quad::translucent("bounded", 10.0, 1.0, RED_HALF).boxed());
    scene.add_primitive(Quad::translucent("unbounded", 20.0, 1.0, RED_HALF).unbounded().boxed());
    scene.render(Some(0.0))?;

    let labels = draw_labels(&scene);
    let first_unbounded = labels.iter().position(|l| l == "unbounded");
    let first_bounded = labels.iter().position(|l| l == "bounded");
    assert!(first_unbounded < first_bounded, "{labels:?}");
    Ok(())
}

#[test]
fn sorted_translucency_blends_over_background() -> Result<()> {
    let mut scene = scene_without_oit();
    scene.add_primitive(Quad::translucent("glass", 10.0, 1.0, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    assert!(!scene.order_independent_translucency());
    assert_eq!(scene.context().pixel(32, 32), Some([128, 0, 0, 255]));
    assert!(has_event(
        &scene,
        &ContextEvent::CopyColor {
            source: "Globe Depth",
            destination: "Primary"
        }
    ));
    Ok(())
}

#[test]
fn oit_accumulates_and_resolves_into_primary() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::translucent("glass", 10.0, 1.0, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    assert!(scene.order_independent_translucency());
    let glass = draws(&scene)
        .into_iter()
        .find(|d| d.0 == "glass")
        .expect("glass drawn");
    assert_eq!(glass.1, "OIT Accumulation");
    assert_eq!(glass.2, DrawMode::TranslucentAccumulate);

    assert!(has_event(
        &scene,
        &ContextEvent::ResolveTranslucency {
            destination: "Primary"
        }
    ));
    assert!(!has_event(
        &scene,
        &ContextEvent::CopyColor {
            source: "Globe Depth",
            destination: "Primary"
        }
    ));
    // Same result as sorted blending for a single layer.
    assert_eq!(scene.context().pixel(32, 32), Some([128, 0, 0, 255]));
    Ok(())
}

#[test]
fn oit_resolves_into_fxaa_input_when_fxaa_is_on() -> Result<()> {
    let mut scene = common::scene_with(SceneSettings::default());
    scene.add_primitive(Quad::translucent("glass", 10.0, 1.0, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    assert!(has_event(&scene, &ContextEvent::ResolveTranslucency { destination: "FXAA" }));
    assert!(has_event(
        &scene,
        &ContextEvent::PostProcess {
            effect: PostEffect::Fxaa,
            destination: "Primary"
        }
    ));
    Ok(())
}

#[test]
fn opaque_only_frame_skips_translucency_targets() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    let journal = scene.context().journal();
    assert!(!journal.iter().any(|e| matches!(e, ContextEvent::ResolveTranslucency { .. })));
    assert!(!journal.iter().any(|e| matches!(e, ContextEvent::Clear { target: "OIT Accumulation", .. })));
    assert_eq!(scene.context().pixel(32, 32), Some([255, 255, 255, 255]));
    assert_eq!(scene.context().pixel(0, 0), Some([0, 0, 0, 255]));
    Ok(())
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn fxaa_copies_globe_color_then_runs_into_primary() -> Result<()> {
    let mut scene = common::scene_with(SceneSettings::default());
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    let journal = scene.context().journal();
    let copy = journal
        .iter()
        .position(|e| {
            *e == ContextEvent::CopyColor {
                source: "Globe Depth",
                destination: "FXAA",
            }
        })
        .expect("globe color copied into FXAA input");
    let fxaa = journal
        .iter()
        .position(|e| {
            *e == ContextEvent::PostProcess {
                effect: PostEffect::Fxaa,
                destination: "Primary",
            }
        })
        .expect("FXAA executed");
    assert!(copy < fxaa);
    assert_eq!(journal.last(), Some(&ContextEvent::EndFrame));
    Ok(())
}

#[test]
fn without_depth_textures_draws_go_to_primary() -> Result<()> {
    let context = common::context().with_capabilities(ContextCapabilities {
        depth_texture: false,
        float_textures: true,
    });
    let mut scene = stratum::Scene::new(context, common::camera(), common::settings())?;
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.add_primitive(Quad::translucent("glass", 5.0, 1.0, RED_HALF).boxed());
    scene.render(Some(0.0))?;

    assert!(!scene.pick_position_supported());
    for (label, target, ..) in draws(&scene) {
        assert_eq!(target, "Primary", "{label}");
    }
    assert!(!scene
        .context()
        .journal()
        .iter()
        .any(|e| matches!(e, ContextEvent::CopyPackedDepth { .. })));
    Ok(())
}

#[test]
fn pick_depth_is_captured_once_per_frustum() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("near", 10.0, 0.5).boxed());
    scene.add_primitive(Quad::opaque("far", 50_000.0, 0.5).boxed());
    scene.render(Some(0.0))?;

    let captures = scene
        .context()
        .journal()
        .iter()
        .filter(|e| {
            **e == ContextEvent::CopyPackedDepth {
                source: "Globe Depth",
                destination: "Pick Depth",
            }
        })
        .count();
    assert_eq!(captures, scene.number_of_frustums());
    Ok(())
}

// ============================================================================
// Globe, Ground and Depth Plane
// ============================================================================

#[test]
fn globe_pass_runs_before_opaque_with_depth_plane() -> Result<()> {
    let mut scene = common::scene();
    scene.globe = Some(Box::new(TestGlobe::new()));
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).with_pass(Pass::Ground).boxed());
    scene.add_primitive(Quad::opaque("box", 20.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(scene.number_of_frustums(), 1);
    assert_eq!(draw_labels(&scene), vec!["terrain", "wall", "Depth Plane", "box"]);
    Ok(())
}

#[test]
fn terrain_depth_testing_disables_depth_plane() -> Result<()> {
    let mut scene = common::scene();
    let mut globe = TestGlobe::new();
    globe.depth_test_against_terrain = true;
    scene.globe = Some(Box::new(globe));
    scene.add_primitive(Quad::opaque("box", 20.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(draw_labels(&scene), vec!["terrain", "box"]);
    Ok(())
}

#[test]
fn copy_globe_depth_setting_copies_after_globe_pass() -> Result<()> {
    let mut scene = common::scene_with(SceneSettings {
        copy_globe_depth: true,
        ..common::settings()
    });
    scene.globe = Some(Box::new(TestGlobe::new()));
    scene.render(Some(0.0))?;

    let journal = scene.context().journal();
    let terrain = journal
        .iter()
        .position(|e| e.draw_label() == Some("terrain"))
        .expect("terrain drawn");
    let copy = journal
        .iter()
        .position(|e| {
            *e == ContextEvent::CopyPackedDepth {
                source: "Globe Depth",
                destination: "Globe Depth Copy",
            }
        })
        .expect("globe depth copied");
    assert!(terrain < copy);
    Ok(())
}

// ============================================================================
// Sun Bloom
// ============================================================================

#[test]
fn sun_renders_into_bloom_target_then_composites() -> Result<()> {
    let mut scene = common::scene();
    scene.sun = Some(Box::new(TestSun::new()));
    scene.render(Some(0.0))?;

    let sun = draws(&scene)
        .into_iter()
        .find(|d| d.0 == "sun")
        .expect("sun drawn");
    assert_eq!(sun.1, "Sun Bloom");
    assert!(has_event(
        &scene,
        &ContextEvent::PostProcess {
            effect: PostEffect::SunBloom,
            destination: "Globe Depth"
        }
    ));
    Ok(())
}

#[test]
fn disabling_bloom_draws_sun_into_scene_target() -> Result<()> {
    let mut scene = common::scene();
    scene.sun = Some(Box::new(TestSun::new()));
    scene.render(Some(0.0))?;

    scene.set_settings(SceneSettings {
        sun_bloom: false,
        ..common::settings()
    })?;
    scene.context_mut().take_journal();
    scene.render(Some(1.0))?;

    let sun = draws(&scene)
        .into_iter()
        .find(|d| d.0 == "sun")
        .expect("sun drawn");
    assert_eq!(sun.1, "Globe Depth");
    assert!(!scene
        .context()
        .journal()
        .iter()
        .any(|e| matches!(e, ContextEvent::PostProcess { effect: PostEffect::SunBloom, .. })));
    Ok(())
}

// ============================================================================
// Side Channels and Debugging
// ============================================================================

struct ComputeProbe;

impl Primitive for ComputeProbe {
    fn update(&mut self, update: &mut PrimitiveUpdate<'_>) -> Result<()> {
        update.push(ComputeCommand::new("probe", UVec3::ONE));
        Ok(())
    }

    fn show(&self) -> bool {
        true
    }

    fn set_show(&mut self, _show: bool) {}
}

#[test]
fn compute_runs_before_and_overlay_after_frustums() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Box::new(ComputeProbe));
    scene.add_primitive(Quad::opaque("hud", 10.0, 1.0).with_pass(Pass::Overlay).boxed());
    scene.add_primitive(Quad::opaque("box", 20.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    let journal = scene.context().journal();
    let compute = journal
        .iter()
        .position(|e| matches!(e, ContextEvent::Compute { label } if label == "probe"))
        .expect("compute executed");
    let first_clear = journal
        .iter()
        .position(|e| matches!(e, ContextEvent::Clear { .. }))
        .expect("frame cleared");
    assert!(compute < first_clear);
    assert_eq!(draw_labels(&scene), vec!["box", "hud"]);
    Ok(())
}

#[test]
fn picking_skips_compute_and_overlay() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Box::new(ComputeProbe));
    scene.add_primitive(Quad::opaque("hud", 10.0, 1.0).with_pass(Pass::Overlay).boxed());
    scene.render(Some(0.0))?;
    scene.context_mut().take_journal();

    scene.pick(common::CENTER)?;
    let journal = scene.context().journal();
    assert!(!journal.iter().any(|e| matches!(e, ContextEvent::Compute { .. })));
    assert!(journal.iter().all(|e| e.draw_label() != Some("hud")));
    Ok(())
}

#[test]
fn inspector_filter_skips_commands() -> Result<()> {
    let mut scene = common::scene();
    scene.debug.inspector = Some(Box::new(DebugCommandInspector::new().with_filter(|command: &Command| {
        command.as_draw().is_none_or(|d| d.label != "hidden")
    })));
    scene.add_primitive(Quad::opaque("hidden", 10.0, 1.0).boxed());
    scene.add_primitive(Quad::opaque("shown", 20.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    assert_eq!(draw_labels(&scene), vec!["shown"]);
    Ok(())
}

#[test]
fn frustum_tint_colors_draws_by_overlap() -> Result<()> {
    let mut scene = common::scene();
    scene.debug.show_frustums = true;
    scene.debug.inspector = Some(Box::new(DebugCommandInspector::new().with_show_frustums(true)));
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;

    let stats = scene.debug_frustum_statistics().expect("statistics collected");
    assert_eq!(stats.total_commands, 1);

    let wall = draws(&scene)
        .into_iter()
        .find(|d| d.0 == "wall")
        .expect("wall drawn");
    assert_eq!(
        wall.2,
        DrawMode::Color {
            tint: Some(Color::new(1.0, 0.0, 0.0, 1.0))
        }
    );
    // White multiplied by the first frustum's red.
    assert_eq!(scene.context().pixel(32, 32), Some([255, 0, 0, 255]));
    Ok(())
}

#[test]
fn resize_recreates_auxiliary_targets() -> Result<()> {
    let mut scene = common::scene();
    scene.add_primitive(Quad::opaque("wall", 10.0, 1.0).boxed());
    scene.render(Some(0.0))?;
    let before = scene.context().framebuffer_count();

    scene.context_mut().resize(UVec2::new(32, 32));
    scene.render(Some(1.0))?;

    assert_eq!(scene.context().framebuffer_count(), before);
    assert_eq!(scene.context().pixel(16, 16), Some([255, 255, 255, 255]));
    assert!(scene.pick(DVec2::new(16.5, 16.5))?.is_some());
    Ok(())
}
