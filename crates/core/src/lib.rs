//! Cube text: lays a glyph bitmap out as a grid of cubes and animates them
//! through a plugin pipeline, one frame at a time.
//!
//! # Invariants
//! - The cube batch is populated in one pass, either wholly before or wholly
//!   after a frame; a pending rasterization never exposes partial text.
//! - Plugins of one extension point run in registration order every frame.
//! - A failing plugin is logged and skipped; it never aborts the frame.
//! - After [`CubeText::stop`] no further frame runs until [`CubeText::run`].

mod cube_text;
mod layout;
mod options;
mod plugin;
pub mod plugins;
mod scheduler;
mod screen;
mod timeline;

pub use cube_text::{CubeText, CubeTextConfig, OriginCubes};
pub use layout::{CubeInfo, CubeOrigin, CubePosition, PlacedCube, TextLayout, layout_bitmap};
pub use options::{Align, CubeOptions, PlatformQuirks, TextOptions};
pub use plugin::{
    CameraFn, CameraPlugin, ExtensionPoint, FrameTime, InitCubeFn, InitCubePlugin, Plugin,
    PluginId, RenderFn, RenderPlugin, camera_fn, init_cube_fn, render_fn,
};
pub use scheduler::{FrameScheduler, ManualScheduler};
pub use screen::CubeTextScreen;
pub use timeline::{Phase, Timeline, TimelineConfig};

use cubetext_glyph::GlyphError;
use cubetext_render::RenderError;

/// Default alpha threshold: pixels at or below it produce no cube.
pub const DEFAULT_THRESHOLD: u8 = 10;

/// Errors raised to callers of [`CubeText`].
#[derive(Debug, thiserror::Error)]
pub enum CubeTextError {
    #[error("text cannot be zero-length")]
    EmptyText,
    #[error("font size must be greater than zero")]
    ZeroFontSize,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Glyph(#[from] GlyphError),
}

/// A plugin invocation that could not complete. Logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin failed: {0}")]
    Failed(String),
}
