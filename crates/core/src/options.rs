use cubetext_glyph::DrawType;
use serde::{Deserialize, Serialize};

/// How the text is rasterized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Font size in pixels.
    pub size: f32,
    /// Free-form style string, e.g. `italic`.
    pub style: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            style: String::new(),
        }
    }
}

/// Horizontal placement of the text relative to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// First column on the origin.
    Left,
    /// Text centred on the origin.
    #[default]
    Center,
    /// Last column on the origin.
    Right,
}

/// How pixels become cubes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeOptions {
    /// Edge length of one cube.
    pub size: f32,
    /// Distance between neighbouring cube centres.
    pub margin: f32,
    pub align: Align,
    pub draw_type: DrawType,
}

impl Default for CubeOptions {
    fn default() -> Self {
        Self {
            size: 1.0,
            margin: 2.0,
            align: Align::Center,
            draw_type: DrawType::Fill,
        }
    }
}

/// Platform behaviours the embedding layer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformQuirks {
    /// Clearing the surface alone leaves stale content; clearing text redraws
    /// a single invisible glyph instead.
    pub redraw_on_clear: bool,
}
