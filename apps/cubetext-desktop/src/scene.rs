use cubetext_core::plugins::{
    Fullscreen, FullscreenConfig, GradientColor, GradientColorConfig, Jitter, JitterConfig, OrbitY,
    OrbitYConfig, RadiusOrbit, RadiusOrbitConfig, RandomColor, RandomColorConfig, RandomPosition,
    RandomPositionConfig, RandomRotation, RewindToOrigin, RotateTo, RotateToConfig, SpinUp,
    SpinUpConfig, Zoom, ZoomConfig,
};
use cubetext_core::{CubeOptions, Plugin, TextOptions, TimelineConfig};
use glam::Quat;
use serde::Deserialize;
use std::path::Path;

/// One plugin entry of a scene file, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginSpec {
    RandomColor(RandomColorConfig),
    RandomRotation,
    RandomPosition(RandomPositionConfig),
    GradientColor(GradientColorConfig),
    RotateTo(RotateToConfig),
    RewindToOrigin(TimelineConfig),
    Jitter(JitterConfig),
    RadiusOrbit(RadiusOrbitConfig),
    Fullscreen(FullscreenConfig),
    Zoom(ZoomConfig),
    OrbitY(OrbitYConfig),
    SpinUp(SpinUpConfig),
}

impl PluginSpec {
    pub fn build(&self) -> Plugin {
        match self {
            PluginSpec::RandomColor(c) => Plugin::init_cube(RandomColor::new(c.clone())),
            PluginSpec::RandomRotation => Plugin::init_cube(RandomRotation::new()),
            PluginSpec::RandomPosition(c) => Plugin::init_cube(RandomPosition::new(*c)),
            PluginSpec::GradientColor(c) => Plugin::init_cube(GradientColor::new(*c)),
            PluginSpec::RotateTo(c) => Plugin::render(RotateTo::new(*c)),
            PluginSpec::RewindToOrigin(c) => Plugin::render(RewindToOrigin::new(*c)),
            PluginSpec::Jitter(c) => Plugin::render(Jitter::new(*c)),
            PluginSpec::RadiusOrbit(c) => Plugin::render(RadiusOrbit::new(*c)),
            PluginSpec::Fullscreen(c) => Plugin::camera(Fullscreen::new(*c)),
            PluginSpec::Zoom(c) => Plugin::camera(Zoom::new(*c)),
            PluginSpec::OrbitY(c) => Plugin::camera(OrbitY::new(*c)),
            PluginSpec::SpinUp(c) => Plugin::camera(SpinUp::new(*c)),
        }
    }
}

/// Cubes fly in from a scattered cloud, untwist, and the camera frames the text.
pub fn default_plugins() -> Vec<PluginSpec> {
    let assemble = TimelineConfig::new(2000.0).starting_at(300.0);
    vec![
        PluginSpec::RandomPosition(RandomPositionConfig::default()),
        PluginSpec::RandomRotation,
        PluginSpec::RewindToOrigin(assemble),
        PluginSpec::RotateTo(RotateToConfig {
            timeline: assemble,
            target: Quat::IDENTITY,
        }),
        PluginSpec::Fullscreen(FullscreenConfig {
            scale: 1.2,
            ..FullscreenConfig::default()
        }),
    ]
}

/// Optional JSON scene file. Every field falls back to the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub text: Option<String>,
    pub text_options: Option<TextOptions>,
    pub cube_options: Option<CubeOptions>,
    pub threshold: Option<u8>,
    pub plugins: Option<Vec<PluginSpec>>,
}

impl Scene {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn plugins(&self) -> Vec<PluginSpec> {
        self.plugins.clone().unwrap_or_else(default_plugins)
    }
}
