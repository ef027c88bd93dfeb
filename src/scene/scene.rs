use std::time::{Duration, Instant};

use glam::{DVec2, DVec3, UVec2};
use log::{error, trace};
use uuid::Uuid;

use crate::errors::{Result, StratumError};
use crate::math::{BoundingSphere, Color, Intersect, Occluder};
use crate::picking::{
    PickFramebuffer, PickRegistry, PickedObject, orthographic_pick_volume, perspective_pick_volume,
    unpack_depth, unproject,
};
use crate::renderer::binning::{BinningInput, CommandBinner};
use crate::renderer::command::{CommandList, DrawCommand};
use crate::renderer::context::{PassState, Rectangle, RenderContext};
use crate::renderer::debug::{DebugSettings, FrustumStatistics};
use crate::renderer::executor::{ExecuteFrame, FrameEnvironment, GlobeInfo, PassExecutor};
use crate::renderer::settings::{PickRectangle, SceneSettings};
use crate::scene::camera::{Camera, FrustumProjection};
use crate::scene::events::{CameraEvent, Event, RenderErrorEvent, RenderEvent};
use crate::scene::frame_state::{FramePasses, FrameState, next_frame_number};
use crate::scene::mode::SceneMode;
use crate::scene::primitive::{
    EffectCommands, Globe, Primitive, PrimitiveCollection, PrimitiveKey, PrimitiveUpdate, SkyEffect,
};

/// Tolerance for detecting camera movement between frames.
const CAMERA_EPSILON: f64 = 1e-6;

/// The per-frame pipeline bound to one render context.
///
/// Each [`render`](Scene::render) updates the content producers, culls and
/// bins their commands into sub-frustums, and executes the bins. Picking
/// reruns the same steps with a narrowed culling volume into an off-screen
/// framebuffer.
///
/// Collaborators (globe, sky effects, camera) are plain public fields; they
/// are read at the start of every frame.
pub struct Scene<C: RenderContext> {
    id: Uuid,
    context: C,

    pub camera: Camera,
    mode: SceneMode,
    settings: SceneSettings,
    pub debug: DebugSettings,

    // ==== Content producers ====
    primitives: PrimitiveCollection,
    pub globe: Option<Box<dyn Globe>>,
    pub sky_box: Option<Box<dyn SkyEffect>>,
    pub sky_atmosphere: Option<Box<dyn SkyEffect>>,
    pub sun: Option<Box<dyn SkyEffect>>,
    pub moon: Option<Box<dyn SkyEffect>>,

    // ==== Frame state ====
    frame_state: FrameState,
    commands: CommandList,
    binner: CommandBinner,
    executor: PassExecutor,
    pick_framebuffer: PickFramebuffer,
    pick_ids: PickRegistry,
    pass_state: PassState,

    // ==== Notifications ====
    pub pre_render: Event<RenderEvent>,
    pub post_render: Event<RenderEvent>,
    pub render_error: Event<RenderErrorEvent>,
    pub camera_changed: Event<CameraEvent>,

    camera_snapshot: Camera,
    camera_move_started: bool,
    camera_moved_at: Instant,
    created_at: Instant,
    destroyed: bool,
}

impl<C: RenderContext> Scene<C> {
    pub fn new(context: C, camera: Camera, settings: SceneSettings) -> Result<Self> {
        settings.validate()?;

        let executor = PassExecutor::new(context.capabilities(), &settings);
        let binner = CommandBinner::new(settings.far_to_near_ratio);
        let now = Instant::now();

        Ok(Self {
            id: Uuid::new_v4(),
            context,
            camera,
            mode: SceneMode::Scene3D,
            settings,
            debug: DebugSettings::default(),
            primitives: PrimitiveCollection::new(),
            globe: None,
            sky_box: None,
            sky_atmosphere: None,
            sun: None,
            moon: None,
            frame_state: FrameState::new(camera),
            commands: CommandList::new(),
            binner,
            executor,
            pick_framebuffer: PickFramebuffer::new(),
            pick_ids: PickRegistry::new(),
            pass_state: PassState::default(),
            pre_render: Event::new(),
            post_render: Event::new(),
            render_error: Event::new(),
            camera_changed: Event::new(),
            camera_snapshot: camera,
            camera_move_started: false,
            camera_moved_at: now,
            created_at: now,
            destroyed: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    #[must_use]
    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    /// Switches the viewing mode. Rejects anything but 3D on 3D-only scenes.
    pub fn set_mode(&mut self, mode: SceneMode) -> Result<()> {
        if self.settings.scene_3d_only && mode != SceneMode::Scene3D {
            return Err(StratumError::SceneModeRestricted(mode));
        }
        self.mode = mode;
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// Replaces the settings after validating them.
    ///
    /// `order_independent_translucency` is only read when the scene is
    /// created.
    pub fn set_settings(&mut self, settings: SceneSettings) -> Result<()> {
        settings.validate()?;
        if settings.scene_3d_only && self.mode != SceneMode::Scene3D {
            return Err(StratumError::SceneModeRestricted(self.mode));
        }
        self.binner.set_far_to_near_ratio(settings.far_to_near_ratio);
        self.settings = settings;
        Ok(())
    }

    #[must_use]
    pub fn frame_state(&self) -> &FrameState {
        &self.frame_state
    }

    #[must_use]
    pub fn primitives(&self) -> &PrimitiveCollection {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut PrimitiveCollection {
        &mut self.primitives
    }

    pub fn add_primitive(&mut self, primitive: Box<dyn Primitive>) -> PrimitiveKey {
        self.primitives.add(primitive)
    }

    /// Removes and destroys a primitive, releasing its pick ids.
    pub fn remove_primitive(&mut self, key: PrimitiveKey) -> bool {
        let Some(mut primitive) = self.primitives.remove(key) else {
            return false;
        };
        primitive.destroy(&mut self.context);
        self.pick_ids.release_primitive(key);
        true
    }

    #[must_use]
    pub fn pick_ids(&self) -> &PickRegistry {
        &self.pick_ids
    }

    /// Whether [`pick_position`](Self::pick_position) can be used.
    #[must_use]
    pub fn pick_position_supported(&self) -> bool {
        self.executor.has_depth_capture()
    }

    /// Whether translucency is composited without sorting.
    #[must_use]
    pub fn order_independent_translucency(&self) -> bool {
        self.executor.order_independent_translucency()
    }

    #[must_use]
    pub fn number_of_frustums(&self) -> usize {
        self.binner.frustums().len()
    }

    /// Near and far of sub-frustum `index` as last binned.
    #[must_use]
    pub fn frustum_near_far(&self, index: usize) -> Option<(f64, f64)> {
        self.binner.frustums().get(index).map(|f| (f.near, f.far))
    }

    /// Overlap statistics of the last binning, when `debug.show_frustums`
    /// was set.
    #[must_use]
    pub fn debug_frustum_statistics(&self) -> Option<&FrustumStatistics> {
        self.binner.statistics()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ========================================================================
    // Render
    // ========================================================================

    /// Renders one frame at `time` seconds (seconds since creation if
    /// `None`).
    ///
    /// Failures are logged and delivered to `render_error` listeners; they
    /// are only returned when `rethrow_render_errors` is set.
    pub fn render(&mut self, time: Option<f64>) -> Result<()> {
        if self.destroyed {
            return Err(StratumError::Destroyed);
        }
        let time = time.unwrap_or_else(|| self.created_at.elapsed().as_secs_f64());

        match self.render_frame(time) {
            Ok(()) => Ok(()),
            Err(error) => {
                error!("Render error in scene {}: {error}", self.id);
                let event = RenderErrorEvent {
                    scene: self.id,
                    error,
                };
                self.render_error.raise(&event);
                if self.settings.rethrow_render_errors {
                    Err(event.error)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn render_frame(&mut self, time: f64) -> Result<()> {
        self.update_camera_events();

        let event = RenderEvent {
            scene: self.id,
            time,
        };
        self.pre_render.raise(&event);

        let frame_number = next_frame_number(self.frame_state.frame_number);
        self.update_frame_state(frame_number, time);
        self.frame_state.passes = FramePasses::RENDER;

        self.commands.clear();
        self.update_primitives()?;
        self.create_potentially_visible_set();

        self.pass_state.reset();
        let environment = self.update_environment()?;

        let mut pass_state = self.pass_state;
        let background = self.settings.background_color;
        self.execute(&environment, &mut pass_state, background, false)?;
        self.pass_state = pass_state;

        self.context.end_frame();
        self.frame_state.run_after_render();

        self.post_render.raise(&event);
        Ok(())
    }

    fn update_camera_events(&mut self) {
        if !self.camera.approx_eq(&self.camera_snapshot, CAMERA_EPSILON) {
            if !self.camera_move_started {
                self.camera_changed.raise(&CameraEvent::MoveStart);
                self.camera_move_started = true;
            }
            self.camera_moved_at = Instant::now();
            self.camera_snapshot = self.camera;
        } else if self.camera_move_started
            && self.camera_moved_at.elapsed() > Duration::from_millis(self.settings.camera_event_wait_time_ms)
        {
            self.camera_changed.raise(&CameraEvent::MoveEnd);
            self.camera_move_started = false;
        }
    }

    fn update_frame_state(&mut self, frame_number: u64, time: f64) {
        let camera = self.camera;
        let frame_state = &mut self.frame_state;
        frame_state.frame_number = frame_number;
        frame_state.time = time;
        frame_state.mode = self.mode;
        frame_state.camera = camera;
        frame_state.culling_volume = camera.culling_volume();
        frame_state.drawing_buffer_size = self.context.drawing_buffer_size();
        frame_state.passes = FramePasses::empty();

        frame_state.occluder = match &self.globe {
            Some(globe) if self.mode == SceneMode::Scene3D && globe.show() => Some(Occluder::from_bounding_sphere(
                BoundingSphere::new(globe.center(), globe.minimum_radius()),
                camera.position,
            )),
            _ => None,
        };
    }

    fn update_primitives(&mut self) -> Result<()> {
        let mut update = PrimitiveUpdate {
            owner: None,
            context: &mut self.context,
            frame_state: &mut self.frame_state,
            commands: &mut self.commands,
            pick_ids: &mut self.pick_ids,
        };

        if let Some(globe) = &mut self.globe {
            if globe.show() {
                globe.update(&mut update)?;
            }
        }

        for index in 0..self.primitives.len() {
            let key = self.primitives.keys()[index];
            let Some(primitive) = self.primitives.get_mut(key) else {
                continue;
            };
            if !primitive.show() {
                continue;
            }
            update.owner = Some(key);
            primitive.update(&mut update)?;
        }
        Ok(())
    }

    fn create_potentially_visible_set(&mut self) {
        let report = self.binner.create_potentially_visible_set(&BinningInput {
            commands: &self.commands,
            culling_volume: &self.frame_state.culling_volume,
            occluder: self.frame_state.occluder.as_ref(),
            camera: &self.frame_state.camera,
            collect_statistics: self.debug.show_frustums,
        });
        trace!(
            "Frame {}: {} commands in {} sub-frustums ({} binning passes)",
            self.frame_state.frame_number,
            self.commands.len(),
            report.plan.count,
            report.passes
        );
    }

    fn update_environment(&mut self) -> Result<FrameEnvironment> {
        let context: &mut dyn RenderContext = &mut self.context;
        let frame_state = &self.frame_state;
        let mut update = |effect: &mut Option<Box<dyn SkyEffect>>| -> Result<Option<EffectCommands>> {
            match effect {
                Some(effect) => effect.update(context, frame_state),
                None => Ok(None),
            }
        };

        let sky_box = update(&mut self.sky_box)?;
        let sky_atmosphere = update(&mut self.sky_atmosphere)?;
        let sun = update(&mut self.sun)?;
        let moon = update(&mut self.moon)?;

        let sun_visible = sun.as_ref().is_some_and(|s| is_effect_visible(&s.draw, frame_state));
        let moon_visible = moon.as_ref().is_some_and(|m| is_effect_visible(&m.draw, frame_state));

        Ok(FrameEnvironment {
            sky_box,
            sky_atmosphere,
            sun,
            sun_visible,
            moon,
            moon_visible,
        })
    }

    fn globe_info(&self) -> Option<GlobeInfo> {
        self.globe.as_ref().filter(|g| g.show()).map(|globe| GlobeInfo {
            center: globe.center(),
            minimum_radius: globe.minimum_radius(),
            depth_test_against_terrain: globe.depth_test_against_terrain(),
        })
    }

    /// Executes the binned commands. Compute and overlay commands only run
    /// when rendering.
    fn execute(
        &mut self,
        environment: &FrameEnvironment,
        pass_state: &mut PassState,
        clear_color: Color,
        picking: bool,
    ) -> Result<()> {
        let globe = self.globe_info();
        let frame = ExecuteFrame {
            commands: &self.commands,
            binner: &self.binner,
            camera: &self.frame_state.camera,
            mode: self.mode,
            environment,
            globe,
            settings: &self.settings,
            debug: &self.debug,
        };
        let context: &mut dyn RenderContext = &mut self.context;

        self.executor
            .manage_sun_bloom(context, self.sun.is_some(), self.settings.sun_bloom);
        if !picking {
            self.executor.execute_compute_commands(context, &frame)?;
        }
        self.executor
            .execute_commands(context, &frame, pass_state, clear_color, picking)?;
        if !picking {
            self.executor
                .execute_overlay_commands(context, &frame, pass_state)?;
        }
        Ok(())
    }

    // ========================================================================
    // Picking
    // ========================================================================

    /// Returns the object drawn at `window_position` (top-left origin), or
    /// `None` if nothing with a pick id covers it.
    ///
    /// Reuses the last rendered frame's number and time. Blocks on readback.
    pub fn pick(&mut self, window_position: DVec2) -> Result<Option<PickedObject>> {
        if self.destroyed {
            return Err(StratumError::Destroyed);
        }
        check_window_position(window_position)?;

        let buffer_size = self.context.drawing_buffer_size();
        let PickRectangle { width, height } = self.settings.pick_rectangle;
        let Some(rectangle) = pick_rectangle(window_position, buffer_size, width, height) else {
            return Ok(None);
        };

        self.update_frame_state(self.frame_state.frame_number, self.frame_state.time);
        let camera = &self.frame_state.camera;
        self.frame_state.culling_volume = if self.mode == SceneMode::Scene2D || camera.frustum.is_orthographic() {
            orthographic_pick_volume(camera, buffer_size, window_position, width, height)
        } else {
            perspective_pick_volume(camera, buffer_size, window_position, width, height)
        };
        self.frame_state.passes = FramePasses::PICK;

        self.commands.clear();
        self.update_primitives()?;
        self.create_potentially_visible_set();

        let mut pass_state = self.pick_framebuffer.begin(&mut self.context, rectangle)?;
        let environment = FrameEnvironment::default();
        self.execute(&environment, &mut pass_state, Color::TRANSPARENT, true)?;
        let object = self
            .pick_framebuffer
            .end(&mut self.context, rectangle, &self.pick_ids)?;

        self.context.end_frame();
        self.frame_state.run_after_render();
        Ok(object)
    }

    /// Reconstructs the world position under `window_position` from the
    /// depth captured by the last render.
    ///
    /// Sub-frustums are searched nearest first; the first with a written
    /// depth wins. Errors when depth capture is unsupported or the view is
    /// orthographic.
    pub fn pick_position(&mut self, window_position: DVec2) -> Result<Option<DVec3>> {
        if self.destroyed {
            return Err(StratumError::Destroyed);
        }
        check_window_position(window_position)?;
        if !self.executor.has_depth_capture() {
            return Err(StratumError::PickPositionUnsupported);
        }
        if self.mode == SceneMode::Scene2D || self.camera.frustum.is_orthographic() {
            return Err(StratumError::OrthographicPickPosition);
        }

        let buffer_size = self.context.drawing_buffer_size();
        let Some(pixel) = pixel_at(window_position, buffer_size) else {
            return Ok(None);
        };
        let projection = self.camera.frustum;
        let view = self.camera.view_matrix();

        for pick_depth in self.executor.pick_depths() {
            let Some(framebuffer) = pick_depth.framebuffer() else {
                continue;
            };
            let texel = self
                .context
                .read_pixels(Rectangle::new(pixel.x, pixel.y, 1, 1), Some(framebuffer))?;
            let [r, g, b, a, ..] = texel[..] else {
                continue;
            };

            let depth = unpack_depth([r, g, b, a]);
            if depth > 0.0 && depth < 1.0 {
                let (near, far) = pick_depth.near_far();
                let projection = projection.with_near_far(near, far).projection_matrix();
                return Ok(Some(unproject(window_position, depth, buffer_size, projection, view)));
            }
        }
        Ok(None)
    }

    /// Picks repeatedly at `window_position`, hiding each hit before the
    /// next pick, until nothing is hit or `limit` hits were collected.
    ///
    /// Hits are ordered front to back. Visibility of everything hidden is
    /// restored before returning, on success and on error.
    pub fn drill_pick(&mut self, window_position: DVec2, limit: Option<usize>) -> Result<Vec<PickedObject>> {
        let limit = limit.unwrap_or(usize::MAX);
        let mut hits = Vec::new();
        if limit == 0 {
            return Ok(hits);
        }

        let mut hidden_instances = Vec::new();
        let mut hidden_primitives = Vec::new();
        let result = self.drill(
            window_position,
            limit,
            &mut hits,
            &mut hidden_instances,
            &mut hidden_primitives,
        );

        for (key, instance) in hidden_instances {
            if let Some(primitive) = self.primitives.get_mut(key) {
                primitive.set_instance_show(instance, true);
            }
        }
        for key in hidden_primitives {
            if let Some(primitive) = self.primitives.get_mut(key) {
                primitive.set_show(true);
            }
        }

        result.map(|()| hits)
    }

    fn drill(
        &mut self,
        window_position: DVec2,
        limit: usize,
        hits: &mut Vec<PickedObject>,
        hidden_instances: &mut Vec<(PrimitiveKey, u32)>,
        hidden_primitives: &mut Vec<PrimitiveKey>,
    ) -> Result<()> {
        while let Some(hit) = self.pick(window_position)? {
            // Repeated hit: the producer ignored set_show.
            if hits.contains(&hit) {
                break;
            }
            hits.push(hit);
            if hits.len() >= limit {
                break;
            }

            let Some(primitive) = self.primitives.get_mut(hit.primitive) else {
                break;
            };
            if let Some(instance) = hit.instance
                && primitive.set_instance_show(instance, false)
            {
                hidden_instances.push((hit.primitive, instance));
            } else {
                primitive.set_show(false);
                hidden_primitives.push(hit.primitive);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Releases every context resource owned by the scene and its
    /// producers. Rendering and picking fail afterwards.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.pick_framebuffer.destroy(&mut self.context);
        self.executor.destroy(&mut self.context);

        for (_, mut primitive) in self.primitives.drain() {
            primitive.destroy(&mut self.context);
        }
        if let Some(mut globe) = self.globe.take() {
            globe.destroy(&mut self.context);
        }
        for effect in [&mut self.sky_box, &mut self.sky_atmosphere, &mut self.sun, &mut self.moon] {
            if let Some(mut effect) = effect.take() {
                effect.destroy(&mut self.context);
            }
        }
        self.destroyed = true;
    }
}

impl<C: RenderContext> Drop for Scene<C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<C: RenderContext> std::fmt::Debug for Scene<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("frame_state", &self.frame_state)
            .field("primitives", &self.primitives)
            .field("frustums", &self.binner.frustums().len())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

fn check_window_position(position: DVec2) -> Result<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(StratumError::InvalidArgument {
            name: "window_position",
            reason: format!("must be finite, got {position}"),
        })
    }
}

fn pixel_at(position: DVec2, buffer_size: UVec2) -> Option<UVec2> {
    let x = position.x.floor();
    let y = position.y.floor();
    if x < 0.0 || y < 0.0 || x >= f64::from(buffer_size.x) || y >= f64::from(buffer_size.y) {
        return None;
    }
    Some(UVec2::new(x as u32, y as u32))
}

/// Footprint of a pick centered on `position`, shifted to stay inside the
/// drawing buffer.
fn pick_rectangle(position: DVec2, buffer_size: UVec2, width: u32, height: u32) -> Option<Rectangle> {
    let pixel = pixel_at(position, buffer_size)?;
    let width = width.min(buffer_size.x);
    let height = height.min(buffer_size.y);
    let x = pixel
        .x
        .saturating_sub((width - 1) / 2)
        .min(buffer_size.x - width);
    let y = pixel
        .y
        .saturating_sub((height - 1) / 2)
        .min(buffer_size.y - height);
    Some(Rectangle::new(x, y, width, height))
}

fn is_effect_visible(draw: &DrawCommand, frame_state: &FrameState) -> bool {
    let Some(volume) = &draw.bounding_volume else {
        return true;
    };
    frame_state.culling_volume.compute_visibility(volume) != Intersect::Outside
        && !frame_state
            .occluder
            .as_ref()
            .is_some_and(|o| o.is_occluded(&volume.bounding_sphere()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_rectangle_stays_inside_buffer() {
        let buffer = UVec2::new(64, 48);
        let rect = pick_rectangle(DVec2::new(0.2, 47.9), buffer, 3, 3);
        assert_eq!(rect, Some(Rectangle::new(0, 45, 3, 3)));

        let rect = pick_rectangle(DVec2::new(10.5, 10.5), buffer, 3, 3);
        assert_eq!(rect, Some(Rectangle::new(9, 9, 3, 3)));
    }

    #[test]
    fn pick_rectangle_outside_buffer_is_none() {
        let buffer = UVec2::new(64, 48);
        assert_eq!(pick_rectangle(DVec2::new(-1.0, 5.0), buffer, 1, 1), None);
        assert_eq!(pick_rectangle(DVec2::new(5.0, 48.0), buffer, 1, 1), None);
    }
}
