use crate::plugin::{CameraPlugin, FrameTime};
use crate::screen::CubeTextScreen;
use crate::timeline::{Timeline, TimelineConfig};
use crate::PluginError;
use cubetext_render::Projection;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Smallest eye scale a zoom applies, so the eye never reaches the target.
const MIN_EYE_SCALE: f32 = 1e-3;

/// Eye-to-target distance at which the whole text fills the view.
///
/// `None` for orthographic projections and before any text was laid out.
pub fn fit_distance(screen: &CubeTextScreen) -> Option<f32> {
    let fov = screen.projection.fov()?;
    let tan = (fov * 0.5).tan();
    let aspect = screen.screen_size().aspect();
    let size = screen.computed_size();
    let distance = (size.height / tan * 0.5).max(size.width / (tan * aspect) * 0.5);
    (distance > 0.0).then_some(distance)
}

/// Move the eye to `distance` from the target, keeping its horizontal heading.
fn place_eye(screen: &mut CubeTextScreen, distance: f32) {
    let camera = &mut screen.camera;
    let offset = camera.eye - camera.look_at;
    let norm = Vec3::new(offset.x, 0.0, offset.z).length();
    if norm <= f32::EPSILON {
        camera.eye.x = camera.look_at.x;
        camera.eye.z = camera.look_at.z + distance;
        return;
    }
    camera.eye.x = camera.look_at.x + offset.x * distance / norm;
    camera.eye.z = camera.look_at.z + offset.z * distance / norm;
}

fn scale_eye(screen: &mut CubeTextScreen, scale: f32) {
    let camera = &mut screen.camera;
    let offset = camera.eye - camera.look_at;
    camera.eye.x = camera.look_at.x + offset.x * scale;
    camera.eye.z = camera.look_at.z + offset.z * scale;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullscreenConfig {
    /// Multiplier on the fitting distance; above 1 leaves a border.
    pub scale: f32,
    /// Delay before the first fit, in milliseconds.
    pub start: f32,
}

impl Default for FullscreenConfig {
    fn default() -> Self {
        Self { scale: 1.0, start: 0.0 }
    }
}

/// Keeps the text filling the view every frame.
///
/// Perspective projections move the eye; orthographic ones resize the view.
pub struct Fullscreen {
    config: FullscreenConfig,
    timeline: Timeline,
}

impl Fullscreen {
    pub fn new(config: FullscreenConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(TimelineConfig::default().looping().starting_at(config.start)),
        }
    }
}

impl CameraPlugin for Fullscreen {
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        if self.timeline.advance(time.delta).ratio().is_none() {
            return Ok(false);
        }
        if let Some(distance) = fit_distance(screen) {
            place_eye(screen, distance * self.config.scale);
            return Ok(true);
        }
        let size = screen.computed_size();
        let fit = size.height.max(size.width / screen.screen_size().aspect()) * self.config.scale;
        match &mut screen.projection {
            Projection::Orthographic { height, .. } if fit > 0.0 && *height != fit => {
                *height = fit;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// Grow from the target towards `target_ratio` times the fitting distance.
    #[default]
    Out,
    /// Shrink from the fitting distance towards `target_ratio` of it.
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub timeline: TimelineConfig,
    pub target_ratio: f32,
    pub direction: ZoomDirection,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            target_ratio: 2.0,
            direction: ZoomDirection::Out,
        }
    }
}

/// Zooms relative to the fitting distance over the timeline.
pub struct Zoom {
    config: ZoomConfig,
    timeline: Timeline,
}

impl Zoom {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
        }
    }
}

impl CameraPlugin for Zoom {
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        if let Some(distance) = fit_distance(screen) {
            place_eye(screen, distance);
        }
        let target = self.config.target_ratio;
        let scale = match self.config.direction {
            ZoomDirection::Out => (target * ratio).max(MIN_EYE_SCALE),
            ZoomDirection::In => (1.0 + (target - 1.0) * ratio).max(MIN_EYE_SCALE),
        };
        scale_eye(screen, scale);
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitYConfig {
    pub timeline: TimelineConfig,
    /// Orbit radius; the current horizontal eye distance when unset.
    pub distance: Option<f32>,
}

/// Circles the eye around the target's vertical axis, one turn per cycle.
pub struct OrbitY {
    config: OrbitYConfig,
    timeline: Timeline,
}

impl OrbitY {
    pub fn new(config: OrbitYConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
        }
    }
}

impl CameraPlugin for OrbitY {
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        let camera = &mut screen.camera;
        let distance = self.config.distance.unwrap_or_else(|| {
            let offset = camera.eye - camera.look_at;
            Vec3::new(offset.x, 0.0, offset.z).length()
        });
        let angle = TAU * ratio;
        camera.eye.x = camera.look_at.x + distance * angle.sin();
        camera.eye.z = camera.look_at.z + distance * angle.cos();
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinUpConfig {
    pub timeline: TimelineConfig,
    /// 1 spins clockwise on screen, -1 counter-clockwise.
    pub direction: f32,
}

impl Default for SpinUpConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            direction: 1.0,
        }
    }
}

/// Rolls the camera by turning its up vector, one turn per cycle.
pub struct SpinUp {
    config: SpinUpConfig,
    timeline: Timeline,
}

impl SpinUp {
    pub fn new(config: SpinUpConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
        }
    }
}

impl CameraPlugin for SpinUp {
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        let angle = TAU * ratio;
        screen.camera.up.x = angle.sin() * self.config.direction;
        screen.camera.up.y = angle.cos();
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}
