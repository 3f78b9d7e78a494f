//! Glyph rasterizer: turns a string into a one-byte-per-pixel alpha bitmap.
//!
//! Rasterization with the default font is immediate. Requests naming a font
//! family that is not loaded yet return [`Rasterization::Pending`]; the font is
//! read and parsed on a background thread and the bitmap arrives through
//! [`PendingGlyphs`].

mod bitmap;
mod font;
mod request;

pub use bitmap::GlyphBitmap;
pub use font::{FontRasterizer, MAX_BITMAP_PIXELS};
pub use request::{DrawType, FontFamily, PendingGlyphs, RasterRequest, Rasterization};

use std::path::PathBuf;

/// Errors from glyph rasterization.
#[derive(Debug, thiserror::Error)]
pub enum GlyphError {
    #[error("font data could not be parsed")]
    InvalidFont,
    #[error("failed to load font from {uri}: {source}")]
    FontLoad {
        uri: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font loader stopped before delivering a bitmap")]
    LoaderDisconnected,
    #[error("bitmap data does not match its dimensions")]
    InvalidBitmap,
    #[error("a {width}x{height} bitmap exceeds the pixel limit")]
    BitmapTooLarge { width: u32, height: u32 },
}

/// Source of glyph bitmaps.
pub trait GlyphRasterizer {
    fn rasterize(&mut self, request: &RasterRequest) -> Result<Rasterization, GlyphError>;
}
