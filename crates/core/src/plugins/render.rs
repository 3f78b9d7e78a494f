use crate::PluginError;
use crate::cube_text::OriginCubes;
use crate::plugin::{FrameTime, RenderPlugin};
use crate::screen::CubeTextScreen;
use crate::timeline::{Timeline, TimelineConfig};
use cubetext_render::CubeInstances;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateToConfig {
    pub timeline: TimelineConfig,
    /// Rotation every cube ends up with.
    pub target: Quat,
}

/// Turns every cube from its initial rotation to a common target.
pub struct RotateTo {
    config: RotateToConfig,
    timeline: Timeline,
}

impl RotateTo {
    pub fn new(config: RotateToConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
        }
    }
}

impl RenderPlugin for RotateTo {
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        _: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        for cube in origin.values().flatten() {
            cubes.set_rotation(cube.key(), cube.rotation.slerp(self.config.target, ratio));
        }
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

/// Moves every cube from its initial position back onto its grid cell.
pub struct RewindToOrigin {
    timeline: Timeline,
}

impl RewindToOrigin {
    pub fn new(timeline: TimelineConfig) -> Self {
        Self {
            timeline: Timeline::new(timeline),
        }
    }
}

impl RenderPlugin for RewindToOrigin {
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        _: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        for cube in origin.values().flatten() {
            cubes.set_position(cube.key(), cube.position.lerp(cube.origin.position, ratio));
        }
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub timeline: TimelineConfig,
    /// Maximum offset per axis, in cube sizes.
    pub ratio: f32,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default().looping(),
            ratio: 1.0,
        }
    }
}

/// Shakes every cube around its grid cell by a random offset each frame.
pub struct Jitter {
    config: JitterConfig,
    timeline: Timeline,
    rng: StdRng,
}

impl Jitter {
    pub fn new(config: JitterConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_rng(config: JitterConfig, rng: StdRng) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
            rng,
        }
    }
}

impl RenderPlugin for Jitter {
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        _: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        if self.timeline.advance(time.delta).ratio().is_none() {
            return Ok(false);
        }
        for cube in origin.values().flatten() {
            let key = cube.key();
            let Some(size) = cubes.size(key) else {
                continue;
            };
            let amplitude = size * self.config.ratio;
            let noise =
                Vec3::new(self.rng.random(), self.rng.random(), self.rng.random()) * amplitude;
            cubes.set_position(key, cube.origin.position + noise);
        }
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusOrbitConfig {
    pub timeline: TimelineConfig,
    pub radius: f32,
    /// Offset each cube's phase by its id so they do not move in lockstep.
    pub individual: bool,
}

impl Default for RadiusOrbitConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            radius: 1.0,
            individual: false,
        }
    }
}

/// Circles every cube around its grid cell in the XY plane.
pub struct RadiusOrbit {
    config: RadiusOrbitConfig,
    timeline: Timeline,
}

impl RadiusOrbit {
    pub fn new(config: RadiusOrbitConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(config.timeline),
        }
    }
}

impl RenderPlugin for RadiusOrbit {
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        _: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        let Some(ratio) = self.timeline.advance(time.delta).ratio() else {
            return Ok(false);
        };
        for cube in origin.values().flatten() {
            let key = cube.key();
            let Some(mut position) = cubes.position(key) else {
                continue;
            };
            let phase = if self.config.individual {
                ratio + cube.id as f32 * 0.1
            } else {
                ratio
            };
            let angle = TAU * phase;
            position.x = cube.origin.position.x + angle.cos() * self.config.radius;
            position.y = cube.origin.position.y + angle.sin() * self.config.radius;
            cubes.set_position(key, position);
        }
        Ok(true)
    }

    fn rewind(&mut self) {
        self.timeline.rewind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CubeInfo, CubeOrigin};
    use cubetext_common::{IdGenerator, InstanceKey, SizeConfig};
    use cubetext_render::{
        CubeAttributes, CubeBatch, HeadlessBackend, RenderBatch, ScreenConfig,
    };

    fn cube(id: u32, origin: Vec3, start: Vec3) -> CubeInfo {
        CubeInfo {
            id,
            color: [0.0, 0.0, 0.0, 1.0],
            position: start,
            rotation: Quat::IDENTITY,
            size: 1.0,
            origin: CubeOrigin {
                position: origin,
                rotation: Quat::IDENTITY,
                size: 1.0,
                color: [0.0, 0.0, 0.0, 1.0],
            },
        }
    }

    /// One origin row with the given cubes, mirrored into an initialized batch.
    fn setup(infos: Vec<CubeInfo>) -> (OriginCubes, CubeBatch) {
        let mut gpu = HeadlessBackend::new(4, 4);
        let mut batch = CubeBatch::default();
        batch.init(&mut gpu, IdGenerator::new()).unwrap();
        for info in &infos {
            batch
                .add(
                    info.key(),
                    CubeAttributes {
                        position: info.position.to_array(),
                        size: info.size,
                        ..CubeAttributes::default()
                    },
                )
                .unwrap();
        }
        let mut origin = OriginCubes::new();
        origin.insert(1, infos);
        (origin, batch)
    }

    fn screen() -> CubeTextScreen {
        CubeTextScreen::new(ScreenConfig::default(), SizeConfig::new(10.0, 10.0))
    }

    fn frame(delta: f32) -> FrameTime {
        FrameTime { delta, time: 0.0 }
    }

    #[test]
    fn rewind_to_origin_converges_exactly() {
        let (origin, mut batch) = setup(vec![cube(1, Vec3::ZERO, Vec3::new(10.0, -4.0, 2.0))]);
        let mut plugin = RewindToOrigin::new(TimelineConfig::new(1000.0));
        let s = screen();
        let mut cubes = batch.instances();

        assert!(plugin.render(&origin, &mut cubes, &s, frame(500.0)).unwrap());
        assert_eq!(cubes.position(InstanceKey(1)), Some(Vec3::new(5.0, -2.0, 1.0)));
        assert!(plugin.render(&origin, &mut cubes, &s, frame(500.0)).unwrap());
        assert!(plugin.render(&origin, &mut cubes, &s, frame(16.0)).unwrap());
        assert_eq!(cubes.position(InstanceKey(1)), Some(Vec3::ZERO));
        assert!(!plugin.render(&origin, &mut cubes, &s, frame(16.0)).unwrap());

        plugin.rewind();
        assert!(plugin.render(&origin, &mut cubes, &s, frame(0.0)).unwrap());
        assert_eq!(cubes.position(InstanceKey(1)), Some(Vec3::new(10.0, -4.0, 2.0)));
    }

    #[test]
    fn rotate_to_reaches_target() {
        let (origin, mut batch) = setup(vec![cube(1, Vec3::ZERO, Vec3::ZERO)]);
        let target = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mut plugin = RotateTo::new(RotateToConfig {
            timeline: TimelineConfig::new(100.0),
            target,
        });
        let mut cubes = batch.instances();
        plugin.render(&origin, &mut cubes, &screen(), frame(100.0)).unwrap();
        let rotation = cubes.rotation(InstanceKey(1)).unwrap();
        assert!(rotation.abs_diff_eq(glam::Mat4::from_quat(target), 1e-5));
    }

    #[test]
    fn jitter_stays_within_one_cube() {
        let (origin, mut batch) = setup(vec![
            cube(1, Vec3::ONE, Vec3::ONE),
            cube(2, Vec3::ZERO, Vec3::ZERO),
        ]);
        let mut plugin = Jitter::with_rng(JitterConfig::default(), StdRng::seed_from_u64(7));
        let mut cubes = batch.instances();
        for _ in 0..20 {
            assert!(plugin.render(&origin, &mut cubes, &screen(), frame(16.0)).unwrap());
            let p = cubes.position(InstanceKey(1)).unwrap() - Vec3::ONE;
            assert!(p.min_element() >= 0.0 && p.max_element() < 1.0);
        }
    }

    #[test]
    fn radius_orbit_keeps_depth() {
        let (origin, mut batch) = setup(vec![cube(1, Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0))]);
        let mut plugin = RadiusOrbit::new(RadiusOrbitConfig {
            timeline: TimelineConfig::new(100.0),
            radius: 2.0,
            individual: false,
        });
        let mut cubes = batch.instances();
        plugin.render(&origin, &mut cubes, &screen(), frame(25.0)).unwrap();
        let p = cubes.position(InstanceKey(1)).unwrap();
        assert!(p.x.abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
        assert_eq!(p.z, 3.0);
    }

    #[test]
    fn missing_live_cube_is_ignored() {
        let (origin, mut batch) = setup(vec![cube(1, Vec3::ZERO, Vec3::ONE)]);
        batch.delete(InstanceKey(1));
        let mut plugin = RewindToOrigin::new(TimelineConfig::new(10.0));
        let mut cubes = batch.instances();
        assert!(plugin.render(&origin, &mut cubes, &screen(), frame(5.0)).unwrap());
        assert!(cubes.is_empty());
    }
}
