use crate::{GlyphBitmap, GlyphError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Filled glyphs, or outlines only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawType {
    #[default]
    Fill,
    Stroke,
}

/// A font family loaded on demand from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFamily {
    pub name: String,
    pub uri: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterRequest {
    pub text: String,
    /// Font size in pixels.
    pub size: f32,
    /// Free-form style; `italic` and `oblique` are honoured.
    pub style: String,
    pub draw_type: DrawType,
    /// Alpha at or below this counts as uncovered when tracing outlines.
    pub threshold: u8,
    pub family: Option<FontFamily>,
}

impl RasterRequest {
    pub fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
            style: String::new(),
            draw_type: DrawType::Fill,
            threshold: 0,
            family: None,
        }
    }

    pub fn is_oblique(&self) -> bool {
        let style = self.style.to_ascii_lowercase();
        style.contains("italic") || style.contains("oblique")
    }
}

/// Result of a rasterization request.
#[derive(Debug)]
pub enum Rasterization {
    Ready(GlyphBitmap),
    /// The font is still loading.
    Pending(PendingGlyphs),
}

/// A bitmap that will arrive once a background font load completes.
#[derive(Debug)]
pub struct PendingGlyphs {
    rx: Receiver<Result<GlyphBitmap, GlyphError>>,
}

impl PendingGlyphs {
    /// Wrap the receiving end of a loader's channel.
    pub fn new(rx: Receiver<Result<GlyphBitmap, GlyphError>>) -> Self {
        Self { rx }
    }

    /// Non-blocking check. `None` while still loading.
    pub fn try_take(&mut self) -> Option<Result<GlyphBitmap, GlyphError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(GlyphError::LoaderDisconnected)),
        }
    }

    /// Block until the bitmap arrives.
    pub fn wait(self) -> Result<GlyphBitmap, GlyphError> {
        self.rx.recv().map_err(|_| GlyphError::LoaderDisconnected)?
    }
}
