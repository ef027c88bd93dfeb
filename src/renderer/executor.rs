//! Pass Executor
//!
//! Executes the binned commands of a frame.
//!
//! # Frame sequence
//!
//! ```text
//! clear primary ─► prepare depth capture / OIT / FXAA targets
//!   ─► environment (sky box, atmosphere, sun [+ bloom], moon)
//!   ─► for each sub-frustum, farthest first:
//!        clear depth ─► Globe ─► [copy globe depth] ─► Ground
//!        ─► [clear depth + depth plane] ─► opaque passes
//!        ─► Translucent (OIT or sorted) ─► [pick depth snapshot]
//!   ─► [debug depth views] ─► OIT resolve ─► FXAA ─► copy to primary
//! ```
//!
//! The render target is picked by precedence: sun bloom, depth capture,
//! FXAA input, then the primary target.

use log::debug;

use crate::errors::Result;
use crate::math::Color;
use crate::renderer::binning::CommandBinner;
use crate::renderer::command::{ClearCommand, Command, CommandList};
use crate::renderer::context::{
    ContextCapabilities, DrawMode, FramebufferId, PassState, RenderContext, ViewUniforms,
};
use crate::renderer::debug::DebugSettings;
use crate::renderer::effects::{
    DepthPlane, Fxaa, GlobeDepth, OrderIndependentTranslucency, PickDepth, SunPostProcess,
};
use crate::renderer::pass::Pass;
use crate::renderer::settings::SceneSettings;
use crate::scene::camera::{Camera, FrustumProjection};
use crate::scene::mode::SceneMode;
use crate::scene::primitive::EffectCommands;

/// Near-plane factor applied to every sub-frustum but the nearest during the
/// opaque passes, so adjacent slices overlap slightly.
pub const OPAQUE_FRUSTUM_NEAR_OFFSET: f64 = 0.99;

/// Environment commands gathered for this frame. Empty while picking.
#[derive(Debug, Clone, Default)]
pub struct FrameEnvironment {
    pub sky_box: Option<EffectCommands>,
    pub sky_atmosphere: Option<EffectCommands>,
    pub sun: Option<EffectCommands>,
    pub sun_visible: bool,
    pub moon: Option<EffectCommands>,
    pub moon_visible: bool,
}

/// What the executor needs to know about the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobeInfo {
    pub center: glam::DVec3,
    pub minimum_radius: f64,
    pub depth_test_against_terrain: bool,
}

/// Read-only inputs of one executed frame.
pub struct ExecuteFrame<'a> {
    pub commands: &'a CommandList,
    pub binner: &'a CommandBinner,
    pub camera: &'a Camera,
    pub mode: SceneMode,
    pub environment: &'a FrameEnvironment,
    pub globe: Option<GlobeInfo>,
    pub settings: &'a SceneSettings,
    pub debug: &'a DebugSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecuteMode {
    Color,
    Pick,
    Accumulate,
}

#[derive(Debug)]
pub struct PassExecutor {
    globe_depth: Option<GlobeDepth>,
    debug_globe_depths: Vec<GlobeDepth>,
    pick_depths: Vec<PickDepth>,
    oit: Option<OrderIndependentTranslucency>,
    fxaa: Fxaa,
    sun_post_process: Option<SunPostProcess>,
    sun_bloom: bool,
    depth_plane: DepthPlane,
    /// Sub-frustums captured into `pick_depths` by the last render.
    captured_frustums: usize,
    translucent_scratch: Vec<u32>,
}

impl PassExecutor {
    #[must_use]
    pub fn new(capabilities: ContextCapabilities, settings: &SceneSettings) -> Self {
        Self {
            globe_depth: capabilities.depth_texture.then(GlobeDepth::new),
            debug_globe_depths: Vec::new(),
            pick_depths: Vec::new(),
            oit: settings
                .order_independent_translucency
                .then(OrderIndependentTranslucency::new),
            fxaa: Fxaa::new(),
            sun_post_process: None,
            sun_bloom: false,
            depth_plane: DepthPlane::new(),
            captured_frustums: 0,
            translucent_scratch: Vec::new(),
        }
    }

    /// Whether depth capture (and therefore position picking) is available.
    #[must_use]
    pub fn has_depth_capture(&self) -> bool {
        self.globe_depth.is_some()
    }

    #[must_use]
    pub fn order_independent_translucency(&self) -> bool {
        self.oit.is_some()
    }

    #[must_use]
    pub fn sun_post_process_active(&self) -> bool {
        self.sun_post_process.is_some()
    }

    /// Packed depth snapshots of the last render, nearest first.
    #[must_use]
    pub fn pick_depths(&self) -> &[PickDepth] {
        &self.pick_depths[..self.captured_frustums.min(self.pick_depths.len())]
    }

    /// Creates or releases the sun bloom target to follow the sun's presence
    /// and the bloom setting.
    pub fn manage_sun_bloom(&mut self, context: &mut dyn RenderContext, sun_present: bool, sun_bloom: bool) {
        if sun_present && sun_bloom != self.sun_bloom {
            if sun_bloom {
                self.sun_post_process = Some(SunPostProcess::new());
            } else if let Some(mut post) = self.sun_post_process.take() {
                post.destroy(context);
            }
            self.sun_bloom = sun_bloom;
        } else if !sun_present {
            if let Some(mut post) = self.sun_post_process.take() {
                post.destroy(context);
            }
            self.sun_bloom = false;
        }
    }

    pub fn execute_compute_commands(&self, context: &mut dyn RenderContext, frame: &ExecuteFrame<'_>) -> Result<()> {
        let pass_state = PassState::default();
        for &index in frame.binner.compute_commands() {
            execute_command(context, frame, index, &pass_state, ExecuteMode::Color)?;
        }
        Ok(())
    }

    pub fn execute_overlay_commands(
        &self,
        context: &mut dyn RenderContext,
        frame: &ExecuteFrame<'_>,
        pass_state: &PassState,
    ) -> Result<()> {
        for &index in frame.binner.overlay_commands() {
            execute_command(context, frame, index, pass_state, ExecuteMode::Color)?;
        }
        Ok(())
    }

    /// Executes every binned command of the frame into `pass_state`'s target.
    pub fn execute_commands(
        &mut self,
        context: &mut dyn RenderContext,
        frame: &ExecuteFrame<'_>,
        pass_state: &mut PassState,
        clear_color: Color,
        picking: bool,
    ) -> Result<()> {
        let camera = frame.camera;
        let environment = frame.environment;
        let settings = frame.settings;
        let frustums = frame.binner.frustums();
        let capabilities = context.capabilities();
        let original_framebuffer = pass_state.framebuffer;

        let clear = ClearCommand::color(clear_color);
        context.clear(&clear, pass_state)?;

        // === Auxiliary targets ===

        let use_globe_depth = !picking && self.globe_depth.is_some();
        let mut globe_depth_framebuffer = None;
        if use_globe_depth {
            if let Some(globe_depth) = &mut self.globe_depth {
                globe_depth.update(context)?;
                globe_depth.clear(context, pass_state, clear_color)?;
                globe_depth_framebuffer = globe_depth.framebuffer();
            }
        }

        let render_translucent = frustums.iter().any(|f| f.count(Pass::Translucent) > 0);

        let clear_globe_depth = frame
            .globe
            .is_some_and(|g| !g.depth_test_against_terrain || frame.mode == SceneMode::Scene2D);
        let use_depth_plane = clear_globe_depth && frame.mode == SceneMode::Scene3D;
        if use_depth_plane {
            if let Some(globe) = frame.globe {
                self.depth_plane
                    .update(context, camera, globe.center, globe.minimum_radius)?;
            }
        }

        let mut use_oit = !picking
            && render_translucent
            && self.oit.is_some()
            && OrderIndependentTranslucency::is_supported(capabilities);
        if use_oit {
            match (&mut self.oit, globe_depth_framebuffer) {
                (Some(oit), Some(opaque)) => {
                    oit.update(context, opaque)?;
                    oit.clear(context, pass_state)?;
                }
                _ => use_oit = false,
            }
        }

        let use_fxaa = !picking && settings.fxaa;
        if use_fxaa {
            self.fxaa.update(context)?;
            self.fxaa.clear(context, pass_state, clear_color)?;
        }
        let fxaa_framebuffer = self.fxaa.color_framebuffer();

        let use_bloom = environment.sun_visible && settings.sun_bloom && self.sun_post_process.is_some();
        if use_bloom {
            if let Some(post) = &mut self.sun_post_process {
                pass_state.framebuffer = Some(post.update(context)?);
            }
        } else if use_globe_depth {
            pass_state.framebuffer = globe_depth_framebuffer;
        } else if use_fxaa {
            pass_state.framebuffer = fxaa_framebuffer;
        }

        if pass_state.framebuffer.is_some() {
            context.clear(&clear, pass_state)?;
        }

        // === Environment ===

        set_view(context, camera, camera.frustum.near(), camera.frustum.far());

        for effect in [&environment.sky_box, &environment.sky_atmosphere].into_iter().flatten() {
            execute_effect(context, effect, pass_state)?;
        }

        if environment.sun_visible {
            if let Some(sun) = &environment.sun {
                execute_effect(context, sun, pass_state)?;
                if settings.sun_bloom {
                    if let Some(post) = &self.sun_post_process {
                        let framebuffer = if use_globe_depth {
                            globe_depth_framebuffer
                        } else if use_fxaa {
                            fxaa_framebuffer
                        } else {
                            original_framebuffer
                        };
                        post.execute(context, framebuffer)?;
                        pass_state.framebuffer = framebuffer;
                    }
                }
            }
        }

        // Seen through the atmosphere since the sun is drawn after it.
        if environment.moon_visible {
            if let Some(moon) = &environment.moon {
                execute_effect(context, moon, pass_state)?;
            }
        }

        // === Sub-frustums, back to front ===

        let opaque_mode = if picking {
            ExecuteMode::Pick
        } else {
            ExecuteMode::Color
        };
        let depth_clear = ClearCommand::depth();
        let show_globe_depth = frame.debug.show_globe_depth && use_globe_depth;

        for index in (0..frustums.len()).rev() {
            let frustum = &frustums[index];
            let opaque_near = if index == 0 {
                frustum.near
            } else {
                frustum.near * OPAQUE_FRUSTUM_NEAR_OFFSET
            };
            set_view(context, camera, opaque_near, frustum.far);

            let mut saved_framebuffer = None;
            if show_globe_depth {
                while self.debug_globe_depths.len() <= index {
                    self.debug_globe_depths.push(GlobeDepth::new());
                }
                let debug_depth = &mut self.debug_globe_depths[index];
                debug_depth.update(context)?;
                saved_framebuffer = Some(pass_state.framebuffer);
                pass_state.framebuffer = debug_depth.framebuffer();
            }

            context.clear(&depth_clear, pass_state)?;

            for &command in frustum.commands(Pass::Globe) {
                execute_command(context, frame, command, pass_state, opaque_mode)?;
            }

            if use_globe_depth && (settings.copy_globe_depth || show_globe_depth) {
                let capture = if show_globe_depth {
                    self.debug_globe_depths.get(index)
                } else {
                    self.globe_depth.as_ref()
                };
                if let Some(capture) = capture {
                    capture.execute_copy_depth(context)?;
                }
            }

            if let Some(framebuffer) = saved_framebuffer {
                pass_state.framebuffer = framebuffer;
            }

            for &command in frustum.commands(Pass::Ground) {
                execute_command(context, frame, command, pass_state, opaque_mode)?;
            }

            if clear_globe_depth {
                context.clear(&depth_clear, pass_state)?;
                if use_depth_plane {
                    self.depth_plane.execute(context, pass_state)?;
                }
            }

            for pass in Pass::opaque_passes() {
                for &command in frustum.commands(pass) {
                    execute_command(context, frame, command, pass_state, opaque_mode)?;
                }
            }

            // Translucent geometry uses the exact slice to avoid double blending.
            if index != 0 {
                set_view(context, camera, frustum.near, frustum.far);
            }

            let translucent = frustum.commands(Pass::Translucent);
            if use_oit {
                if let Some(oit) = &self.oit {
                    let accumulation = oit.accumulation_pass(pass_state);
                    for &command in translucent {
                        execute_command(context, frame, command, &accumulation, ExecuteMode::Accumulate)?;
                    }
                }
            } else {
                let mut sorted = std::mem::take(&mut self.translucent_scratch);
                sort_back_to_front(frame, translucent, &mut sorted);
                let result = sorted
                    .iter()
                    .try_for_each(|&command| execute_command(context, frame, command, pass_state, opaque_mode));
                self.translucent_scratch = sorted;
                result?;
            }

            if let Some(source) = globe_depth_framebuffer {
                while self.pick_depths.len() <= index {
                    self.pick_depths.push(PickDepth::new());
                }
                let pick_depth = &mut self.pick_depths[index];
                pick_depth.update(context)?;
                pick_depth.execute_copy_depth(context, source, opaque_near, frustum.far)?;
            }
        }

        if use_globe_depth {
            self.captured_frustums = frustums.len();
        }

        // === Debug views ===

        let selected = frame.debug.show_depth_frustum.saturating_sub(1);
        if show_globe_depth {
            if let Some(debug_depth) = self.debug_globe_depths.get(selected) {
                debug_depth.execute_debug_globe_depth(context, pass_state.framebuffer)?;
            }
        }
        if frame.debug.show_pick_depth && use_globe_depth {
            if let Some(pick_depth) = self.pick_depths.get(selected) {
                pick_depth.execute_debug_pick_depth(context, pass_state.framebuffer)?;
            }
        }

        // === Resolve ===

        if use_oit {
            pass_state.framebuffer = if use_fxaa {
                fxaa_framebuffer
            } else {
                original_framebuffer
            };
            if let Some(oit) = &self.oit {
                oit.execute(context, pass_state.framebuffer)?;
            }
        }

        if use_fxaa {
            if !use_oit && use_globe_depth {
                pass_state.framebuffer = fxaa_framebuffer;
                copy_globe_color(self.globe_depth.as_ref(), context, fxaa_framebuffer)?;
            }
            pass_state.framebuffer = original_framebuffer;
            self.fxaa.execute(context, original_framebuffer)?;
        }

        if !use_oit && !use_fxaa && use_globe_depth {
            pass_state.framebuffer = original_framebuffer;
            copy_globe_color(self.globe_depth.as_ref(), context, original_framebuffer)?;
        }

        Ok(())
    }

    /// Releases every auxiliary framebuffer.
    pub fn destroy(&mut self, context: &mut dyn RenderContext) {
        if let Some(globe_depth) = &mut self.globe_depth {
            globe_depth.destroy(context);
        }
        for globe_depth in &mut self.debug_globe_depths {
            globe_depth.destroy(context);
        }
        self.debug_globe_depths.clear();
        for pick_depth in &mut self.pick_depths {
            pick_depth.destroy(context);
        }
        self.pick_depths.clear();
        self.captured_frustums = 0;
        if let Some(oit) = &mut self.oit {
            oit.destroy(context);
        }
        self.fxaa.destroy(context);
        if let Some(mut post) = self.sun_post_process.take() {
            post.destroy(context);
        }
        self.sun_bloom = false;
        self.depth_plane.destroy(context);
        debug!("Released pass executor framebuffers");
    }
}

fn copy_globe_color(
    globe_depth: Option<&GlobeDepth>,
    context: &mut dyn RenderContext,
    destination: Option<FramebufferId>,
) -> Result<()> {
    match globe_depth {
        Some(globe_depth) => globe_depth.execute_copy_color(context, destination),
        None => Ok(()),
    }
}

fn set_view(context: &mut dyn RenderContext, camera: &Camera, near: f64, far: f64) {
    context.set_view(&ViewUniforms {
        view: camera.view_matrix(),
        projection: camera.frustum.with_near_far(near, far).projection_matrix(),
        camera_position: camera.position,
        near,
        far,
    });
}

fn execute_effect(context: &mut dyn RenderContext, effect: &EffectCommands, pass_state: &PassState) -> Result<()> {
    if let Some(compute) = &effect.compute {
        context.compute(compute)?;
    }
    context.draw(&effect.draw, pass_state, DrawMode::Color { tint: None })
}

/// Stable sort of translucent commands, farthest bounding-volume center first.
/// Commands without bounds sort as infinitely far.
fn sort_back_to_front(frame: &ExecuteFrame<'_>, indices: &[u32], sorted: &mut Vec<u32>) {
    let position = frame.camera.position;
    let distance = |index: u32| {
        frame
            .commands
            .get(index as usize)
            .and_then(Command::bounding_volume)
            .map_or(f64::INFINITY, |v| v.distance_squared_to(position))
    };

    sorted.clear();
    sorted.extend_from_slice(indices);
    sorted.sort_by(|a, b| distance(*b).total_cmp(&distance(*a)));
}

fn execute_command(
    context: &mut dyn RenderContext,
    frame: &ExecuteFrame<'_>,
    index: u32,
    pass_state: &PassState,
    mode: ExecuteMode,
) -> Result<()> {
    let Some(command) = frame.commands.get(index as usize) else {
        return Ok(());
    };
    let inspector = frame.debug.inspector.as_deref();
    if inspector.is_some_and(|i| !i.should_execute(command)) {
        return Ok(());
    }

    match command {
        Command::Draw(draw) => {
            let mode = match mode {
                ExecuteMode::Pick => DrawMode::Pick,
                ExecuteMode::Accumulate => DrawMode::TranslucentAccumulate,
                ExecuteMode::Color => DrawMode::Color {
                    tint: inspector.and_then(|i| i.tint(draw, frame.binner.overlap_mask(index))),
                },
            };
            context.draw(draw, pass_state, mode)
        }
        Command::Clear(clear) => context.clear(clear, pass_state),
        Command::Compute(compute) => context.compute(compute),
    }
}
