use crate::options::{Align, CubeOptions};
use cubetext_common::{Color, InstanceKey, SizeConfig};
use cubetext_glyph::GlyphBitmap;
use glam::{Quat, Vec3};

/// Where a cube sits in the text grid. Handed to init-cube plugins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubePosition {
    /// Aligned world-space x of the grid cell.
    pub x: f32,
    /// Centred world-space y of the grid cell.
    pub y: f32,
    pub column: u32,
    /// Bitmap row, 0 at the top.
    pub row: u32,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    pub margin: f32,
}

impl CubePosition {
    /// Rows counted from the bottom of the bitmap, starting at 1.
    pub fn level(&self) -> u32 {
        self.height - self.row
    }
}

/// Grid state of a cube before any plugin touched it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeOrigin {
    pub position: Vec3,
    pub rotation: Quat,
    pub size: f32,
    pub color: Color,
}

/// One cube as created from the bitmap.
///
/// The top-level fields are the state committed to the batch after the
/// init-cube plugins ran; `origin` keeps the untouched grid state.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeInfo {
    pub id: u32,
    pub color: Color,
    pub position: Vec3,
    pub rotation: Quat,
    pub size: f32,
    pub origin: CubeOrigin,
}

impl CubeInfo {
    pub(crate) fn new(id: u32, cell: &PlacedCube, size: f32) -> Self {
        let origin = CubeOrigin {
            position: Vec3::new(cell.position.x, cell.position.y, 0.0),
            rotation: Quat::IDENTITY,
            size,
            color: [0.0, 0.0, 0.0, f32::from(cell.alpha) / 256.0],
        };
        Self {
            id,
            color: origin.color,
            position: origin.position,
            rotation: origin.rotation,
            size,
            origin,
        }
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey(self.id)
    }
}

/// One inked pixel and the grid cell it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedCube {
    pub position: CubePosition,
    pub alpha: u8,
}

/// Result of laying a bitmap out as cubes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    cubes: Vec<PlacedCube>,
    text_size: SizeConfig,
    computed_size: SizeConfig,
    center: Vec3,
}

impl TextLayout {
    /// Placed cubes in raster order.
    pub fn cubes(&self) -> &[PlacedCube] {
        &self.cubes
    }

    /// Bitmap width and inked row count, in pixels.
    pub fn text_size(&self) -> SizeConfig {
        self.text_size
    }

    /// World-space footprint of the text.
    pub fn computed_size(&self) -> SizeConfig {
        self.computed_size
    }

    /// World-space centre of the text.
    pub fn center(&self) -> Vec3 {
        self.center
    }
}

/// Map every pixel whose alpha exceeds `threshold` to a grid cell.
///
/// Cells are `margin` apart. Rows are flipped so bitmap row 0 ends up on top,
/// and centred on the range of inked rows so blank rows above or below the
/// glyphs do not shift the text.
pub fn layout_bitmap(bitmap: &GlyphBitmap, options: &CubeOptions, threshold: u8) -> TextLayout {
    let width = bitmap.width();
    let height = bitmap.height();
    let margin = options.margin;

    let inked: Vec<_> = bitmap.pixels().filter(|&(_, _, alpha)| alpha > threshold).collect();
    let (Some(top), Some(bottom)) = (
        inked.iter().map(|&(_, row, _)| row).min(),
        inked.iter().map(|&(_, row, _)| row).max(),
    ) else {
        return TextLayout {
            cubes: Vec::new(),
            text_size: SizeConfig::new(width as f32, 0.0),
            computed_size: SizeConfig::new(width as f32 * margin, 0.0),
            center: Vec3::ZERO,
        };
    };

    let span = width.saturating_sub(1) as f32 * margin;
    let shift = match options.align {
        Align::Left => 0.0,
        Align::Center => span * 0.5,
        Align::Right => span,
    };
    let lowest = height - bottom;
    let highest = height - top;
    let middle = (lowest + highest) as f32 * 0.5;

    let cubes = inked
        .into_iter()
        .map(|(column, row, alpha)| {
            let level = height - row;
            PlacedCube {
                position: CubePosition {
                    x: column as f32 * margin - shift,
                    y: (level as f32 - middle) * margin,
                    column,
                    row,
                    width,
                    height,
                    margin,
                },
                alpha,
            }
        })
        .collect();

    let text_size = SizeConfig::new(width as f32, (highest - lowest + 1) as f32);
    TextLayout {
        cubes,
        text_size,
        computed_size: text_size.scaled(margin),
        center: Vec3::new(span * 0.5 - shift, 0.0, 0.0),
    }
}
