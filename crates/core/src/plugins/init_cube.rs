use crate::PluginError;
use crate::layout::{CubeInfo, CubePosition};
use crate::plugin::InitCubePlugin;
use cubetext_common::Color;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

fn apply_color(cube: &mut CubeInfo, color: Color, override_alpha: bool) {
    let alpha = cube.color[3];
    cube.color = color;
    if !override_alpha {
        cube.color[3] = alpha;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedColor {
    pub color: Color,
    /// Relative chance of this color being picked.
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomColorConfig {
    pub palette: Vec<WeightedColor>,
    /// Replace the pixel-derived alpha too.
    pub override_alpha: bool,
}

/// Paints each cube with a color drawn from a weighted palette.
pub struct RandomColor {
    config: RandomColorConfig,
    rng: StdRng,
}

impl RandomColor {
    pub fn new(config: RandomColorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_rng(config: RandomColorConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    fn pick(&mut self) -> Option<Color> {
        let total: f32 = self.config.palette.iter().map(|c| c.weight.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.rng.random::<f32>() * total;
        for entry in &self.config.palette {
            let weight = entry.weight.max(0.0);
            if roll < weight {
                return Some(entry.color);
            }
            roll -= weight;
        }
        // Rounding can leave the roll just past the last bucket.
        self.config.palette.last().map(|c| c.color)
    }
}

impl InitCubePlugin for RandomColor {
    fn init_cube(&mut self, cube: &mut CubeInfo, _: &CubePosition) -> Result<(), PluginError> {
        if let Some(color) = self.pick() {
            apply_color(cube, color, self.config.override_alpha);
        }
        Ok(())
    }
}

/// Gives each cube a uniformly random orientation.
pub struct RandomRotation {
    rng: StdRng,
}

impl Default for RandomRotation {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomRotation {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl InitCubePlugin for RandomRotation {
    fn init_cube(&mut self, cube: &mut CubeInfo, _: &CubePosition) -> Result<(), PluginError> {
        let (u1, u2, u3): (f32, f32, f32) =
            (self.rng.random(), self.rng.random(), self.rng.random());
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        cube.rotation = Quat::from_xyzw(
            a * (TAU * u2).sin(),
            a * (TAU * u2).cos(),
            b * (TAU * u3).sin(),
            b * (TAU * u3).cos(),
        )
        .normalize();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomPositionConfig {
    pub min: Vec3,
    pub max: Vec3,
    /// Scatter around the grid cell instead of around the box centre.
    pub basis: bool,
}

impl Default for RandomPositionConfig {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-50.0),
            max: Vec3::splat(50.0),
            basis: false,
        }
    }
}

/// Scatters each cube inside a box before it appears.
pub struct RandomPosition {
    config: RandomPositionConfig,
    rng: StdRng,
}

impl RandomPosition {
    pub fn new(config: RandomPositionConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_rng(config: RandomPositionConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }
}

impl InitCubePlugin for RandomPosition {
    fn init_cube(&mut self, cube: &mut CubeInfo, _: &CubePosition) -> Result<(), PluginError> {
        let half = (self.config.max - self.config.min) * 0.5;
        let centre = (self.config.max + self.config.min) * 0.5;
        for axis in 0..3 {
            let base = if self.config.basis {
                cube.position[axis] + self.rng.random::<f32>() * half[axis] - half[axis] * 0.5
            } else {
                centre[axis]
            };
            cube.position[axis] = base + self.rng.random::<f32>() * half[axis] * 0.5;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientColorConfig {
    /// Color of the leftmost column.
    pub from: Color,
    /// Color approached by the rightmost column.
    pub to: Color,
    pub override_alpha: bool,
}

impl Default for GradientColorConfig {
    fn default() -> Self {
        Self {
            from: [0.0, 0.0, 0.0, 1.0],
            to: [1.0, 1.0, 1.0, 1.0],
            override_alpha: false,
        }
    }
}

/// Blends two colors across the text from left to right.
pub struct GradientColor {
    config: GradientColorConfig,
}

impl GradientColor {
    pub fn new(config: GradientColorConfig) -> Self {
        Self { config }
    }
}

impl InitCubePlugin for GradientColor {
    fn init_cube(
        &mut self,
        cube: &mut CubeInfo,
        position: &CubePosition,
    ) -> Result<(), PluginError> {
        if position.width == 0 {
            return Err(PluginError::Failed("gradient over a zero-width bitmap".into()));
        }
        let t = position.column as f32 / position.width as f32;
        let from = self.config.from;
        let to = self.config.to;
        let color = std::array::from_fn(|i| from[i] * (1.0 - t) + to[i] * t);
        apply_color(cube, color, self.config.override_alpha);
        Ok(())
    }
}
