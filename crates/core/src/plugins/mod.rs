//! Ready-made plugins for the three extension points.
//!
//! Every animating plugin owns a [`crate::Timeline`] built from its config, so
//! `duration`, `start`, looping, cycle count and rewind behave the same across
//! all of them.

pub mod camera;
pub mod init_cube;
pub mod render;

pub use camera::{
    Fullscreen, FullscreenConfig, OrbitY, OrbitYConfig, SpinUp, SpinUpConfig, Zoom, ZoomConfig,
    ZoomDirection, fit_distance,
};
pub use init_cube::{
    GradientColor, GradientColorConfig, RandomColor, RandomColorConfig, RandomPosition,
    RandomPositionConfig, RandomRotation, WeightedColor,
};
pub use render::{
    Jitter, JitterConfig, RadiusOrbit, RadiusOrbitConfig, RewindToOrigin, RotateTo, RotateToConfig,
};
