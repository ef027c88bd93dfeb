//! Settings Tests
//!
//! Tests for:
//! - Defaults
//! - Partial JSON loading
//! - Validation of the partition ratio and pick footprint

mod common;

use stratum::errors::StratumError;
use stratum::math::Color;
use stratum::renderer::{PickRectangle, SceneSettings};
use stratum::scene::Scene;

#[test]
fn defaults() {
    let settings = SceneSettings::default();
    assert_eq!(settings.far_to_near_ratio, 1000.0);
    assert!(settings.order_independent_translucency);
    assert!(settings.fxaa);
    assert!(settings.sun_bloom);
    assert!(!settings.scene_3d_only);
    assert!(!settings.rethrow_render_errors);
    assert!(!settings.copy_globe_depth);
    assert_eq!(settings.camera_event_wait_time_ms, 500);
    assert_eq!(settings.background_color, Color::BLACK);
    assert_eq!(settings.pick_rectangle, PickRectangle { width: 1, height: 1 });
    assert!(settings.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() -> anyhow::Result<()> {
    let settings = SceneSettings::from_json(
        r#"{
            "fxaa": false,
            "far_to_near_ratio": 500.0,
            "pick_rectangle": { "width": 3, "height": 5 }
        }"#,
    )?;
    assert!(!settings.fxaa);
    assert_eq!(settings.far_to_near_ratio, 500.0);
    assert_eq!(settings.pick_rectangle, PickRectangle { width: 3, height: 5 });
    assert!(settings.sun_bloom);
    assert_eq!(settings.camera_event_wait_time_ms, 500);
    Ok(())
}

#[test]
fn empty_document_is_default() -> anyhow::Result<()> {
    assert_eq!(SceneSettings::from_json("{}")?, SceneSettings::default());
    Ok(())
}

#[test]
fn serialized_settings_load_back() -> anyhow::Result<()> {
    let settings = SceneSettings {
        background_color: Color::new(0.25, 0.5, 0.75, 1.0),
        copy_globe_depth: true,
        ..SceneSettings::default()
    };
    let json = serde_json::to_string(&settings)?;
    assert_eq!(SceneSettings::from_json(&json)?, settings);
    Ok(())
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        SceneSettings::from_json(r#"{ "fxaa": "yes" }"#),
        Err(StratumError::SettingsParse(_))
    ));
    assert!(matches!(
        SceneSettings::from_json("not json"),
        Err(StratumError::SettingsParse(_))
    ));
}

#[test]
fn ratio_must_exceed_one() {
    for ratio in [1.0, 0.5, -10.0, f64::NAN, f64::INFINITY] {
        let settings = SceneSettings {
            far_to_near_ratio: ratio,
            ..SceneSettings::default()
        };
        assert!(
            matches!(settings.validate(), Err(StratumError::InvalidSettings(_))),
            "ratio {ratio} accepted"
        );
    }
    assert!(matches!(
        SceneSettings::from_json(r#"{ "far_to_near_ratio": 1.0 }"#),
        Err(StratumError::InvalidSettings(_))
    ));
}

#[test]
fn pick_rectangle_sides_must_be_odd() {
    for (width, height) in [(2, 1), (1, 4), (0, 1), (1, 0)] {
        let settings = SceneSettings {
            pick_rectangle: PickRectangle { width, height },
            ..SceneSettings::default()
        };
        assert!(
            matches!(settings.validate(), Err(StratumError::InvalidSettings(_))),
            "{width}x{height} accepted"
        );
    }
}

#[test]
fn scene_rejects_invalid_settings() {
    let settings = SceneSettings {
        far_to_near_ratio: 0.0,
        ..SceneSettings::default()
    };
    assert!(Scene::new(common::context(), common::camera(), settings).is_err());

    let mut scene = common::scene();
    let invalid = SceneSettings {
        pick_rectangle: PickRectangle { width: 2, height: 2 },
        ..SceneSettings::default()
    };
    assert!(scene.set_settings(invalid).is_err());
    assert_eq!(scene.settings().pick_rectangle, PickRectangle::default());
}
