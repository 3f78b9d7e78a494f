use crate::{
    DrawType, FontFamily, GlyphBitmap, GlyphError, GlyphRasterizer, PendingGlyphs, RasterRequest,
    Rasterization,
};
use rusttype::{Font, Scale, point};
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

/// Horizontal shear applied for italic/oblique styles, in pixels per pixel of height.
const OBLIQUE_SHEAR: f32 = 0.2;

/// Largest bitmap, in pixels, a single request may produce.
pub const MAX_BITMAP_PIXELS: u64 = 1 << 26;

type FontCache = Arc<Mutex<HashMap<String, Font<'static>>>>;

/// rusttype-backed rasterizer with a default font and a cache of loaded families.
pub struct FontRasterizer {
    default: Font<'static>,
    families: FontCache,
}

impl FontRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, GlyphError> {
        let default = Font::try_from_vec(bytes).ok_or(GlyphError::InvalidFont)?;
        Ok(Self {
            default,
            families: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GlyphError> {
        Self::from_bytes(read_font(path.as_ref())?)
    }

    fn load_in_background(&self, family: FontFamily, request: RasterRequest) -> PendingGlyphs {
        let (tx, rx) = mpsc::channel();
        let cache = Arc::clone(&self.families);
        tracing::debug!(family = %family.name, uri = %family.uri.display(), "loading font family");
        std::thread::spawn(move || {
            let result = read_font(&family.uri)
                .and_then(|bytes| Font::try_from_vec(bytes).ok_or(GlyphError::InvalidFont))
                .and_then(|font| {
                    let bitmap = render(&font, &request);
                    cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(family.name.clone(), font);
                    bitmap
                });
            if let Err(err) = &result {
                tracing::warn!(family = %family.name, error = %err, "font family failed to load");
            }
            // The receiver may have been superseded; nothing to do then.
            let _ = tx.send(result);
        });
        PendingGlyphs::new(rx)
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(&mut self, request: &RasterRequest) -> Result<Rasterization, GlyphError> {
        let Some(family) = &request.family else {
            return render(&self.default, request).map(Rasterization::Ready);
        };
        let cached = self
            .families
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&family.name)
            .cloned();
        match cached {
            Some(font) => render(&font, request).map(Rasterization::Ready),
            None => Ok(Rasterization::Pending(
                self.load_in_background(family.clone(), request.clone()),
            )),
        }
    }
}

fn read_font(path: &Path) -> Result<Vec<u8>, GlyphError> {
    std::fs::read(path).map_err(|source| GlyphError::FontLoad {
        uri: path.to_path_buf(),
        source,
    })
}

/// Lay out `request.text` on one line and rasterize it.
///
/// The bitmap is as tall as the font's ascent plus descent and as wide as the
/// advance or the ink, whichever is larger.
fn render(font: &Font<'static>, request: &RasterRequest) -> Result<GlyphBitmap, GlyphError> {
    let scale = Scale::uniform(request.size);
    let metrics = font.v_metrics(scale);
    let height = (metrics.ascent - metrics.descent).ceil().max(1.0) as u32;
    let shear = if request.is_oblique() { OBLIQUE_SHEAR } else { 0.0 };

    let glyphs: Vec<_> = font
        .layout(&request.text, scale, point(0.0, metrics.ascent))
        .collect();
    let advance = glyphs
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);
    let ink_right = glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box())
        .map(|bb| bb.max.x)
        .max()
        .unwrap_or(0);
    let slant = (metrics.ascent * shear).ceil() as i32;
    let width = (advance.ceil() as i32).max(ink_right).max(1).saturating_add(slant);
    let width = width as u32;

    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_BITMAP_PIXELS {
        return Err(GlyphError::BitmapTooLarge { width, height });
    }
    let mut alpha = vec![0u8; pixels as usize];
    for glyph in &glyphs {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|x, y, coverage| {
            let py = bb.min.y + y as i32;
            let offset = ((metrics.ascent - py as f32) * shear).round() as i32;
            let px = bb.min.x + x as i32 + offset;
            if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                return;
            }
            let idx = py as usize * width as usize + px as usize;
            let value = (coverage * 255.0).round() as u8;
            alpha[idx] = alpha[idx].max(value);
        });
    }

    let bitmap = GlyphBitmap::from_parts(width, height, alpha);
    Ok(match request.draw_type {
        DrawType::Fill => bitmap,
        DrawType::Stroke => bitmap.edges(request.threshold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const DEJAVU: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");

    fn rasterizer() -> FontRasterizer {
        FontRasterizer::from_bytes(DEJAVU.to_vec()).unwrap()
    }

    fn ready(rasterizer: &mut FontRasterizer, request: &RasterRequest) -> GlyphBitmap {
        match rasterizer.rasterize(request).unwrap() {
            Rasterization::Ready(bitmap) => bitmap,
            Rasterization::Pending(_) => panic!("default font should rasterize immediately"),
        }
    }

    fn inked(bitmap: &GlyphBitmap, threshold: u8) -> Vec<(u32, u32)> {
        bitmap
            .pixels()
            .filter(|&(_, _, a)| a > threshold)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        assert!(matches!(
            FontRasterizer::from_bytes(vec![0, 1, 2, 3]),
            Err(GlyphError::InvalidFont)
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = FontRasterizer::from_file("/nonexistent/font.ttf").err().unwrap();
        match err {
            GlyphError::FontLoad { uri, .. } => {
                assert_eq!(uri, PathBuf::from("/nonexistent/font.ttf"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn filled_glyph_spans_ascent_to_descent() {
        let mut r = rasterizer();
        let request = RasterRequest::new("A", 32.0);
        let bitmap = ready(&mut r, &request);

        let font = Font::try_from_bytes(DEJAVU).unwrap();
        let metrics = font.v_metrics(Scale::uniform(32.0));
        assert_eq!(bitmap.height(), (metrics.ascent - metrics.descent).ceil() as u32);
        let advance = font.glyph('A').scaled(Scale::uniform(32.0)).h_metrics().advance_width;
        assert!(bitmap.width() >= advance.ceil() as u32);
        assert_eq!(bitmap.data().len(), (bitmap.width() * bitmap.height()) as usize);

        let ink = inked(&bitmap, 10);
        assert!(ink.len() > 50, "only {} pixels inked", ink.len());
        assert!(bitmap.data().contains(&255));
    }

    #[test]
    fn wider_text_gives_wider_bitmap() {
        let mut r = rasterizer();
        let narrow = ready(&mut r, &RasterRequest::new("i", 24.0));
        let wide = ready(&mut r, &RasterRequest::new("WWW", 24.0));
        assert_eq!(narrow.height(), wide.height());
        assert!(wide.width() > narrow.width() * 3);
    }

    #[test]
    fn stroke_keeps_a_subset_of_the_fill() {
        let mut r = rasterizer();
        let fill = ready(&mut r, &RasterRequest::new("A", 48.0));
        let stroke = ready(
            &mut r,
            &RasterRequest {
                draw_type: DrawType::Stroke,
                threshold: 10,
                ..RasterRequest::new("A", 48.0)
            },
        );
        assert_eq!((fill.width(), fill.height()), (stroke.width(), stroke.height()));

        let filled = inked(&fill, 10);
        let outline = inked(&stroke, 10);
        assert!(!outline.is_empty());
        assert!(outline.len() < filled.len());
        for &(x, y) in &outline {
            assert_eq!(stroke.alpha(x, y), fill.alpha(x, y));
        }
    }

    #[test]
    fn italic_is_sheared_right() {
        let mut r = rasterizer();
        let upright = ready(&mut r, &RasterRequest::new("A", 40.0));
        let italic = ready(
            &mut r,
            &RasterRequest {
                style: "italic".into(),
                ..RasterRequest::new("A", 40.0)
            },
        );

        let font = Font::try_from_bytes(DEJAVU).unwrap();
        let ascent = font.v_metrics(Scale::uniform(40.0)).ascent;
        let slant = (ascent * OBLIQUE_SHEAR).ceil() as u32;
        assert_eq!(italic.height(), upright.height());
        assert_eq!(italic.width(), upright.width() + slant);

        // The top rows move right more than the bottom rows.
        let mean_x = |b: &GlyphBitmap, rows: std::ops::Range<u32>| {
            let ink: Vec<_> = inked(b, 10).into_iter().filter(|(_, y)| rows.contains(y)).collect();
            ink.iter().map(|(x, _)| *x as f32).sum::<f32>() / ink.len() as f32
        };
        let h = upright.height();
        let top = h / 4..h / 2;
        let bottom = h / 2..h * 3 / 4;
        let top_shift = mean_x(&italic, top.clone()) - mean_x(&upright, top);
        let bottom_shift = mean_x(&italic, bottom.clone()) - mean_x(&upright, bottom);
        assert!(top_shift > bottom_shift);
    }

    #[test]
    fn huge_font_size_is_rejected() {
        let mut r = rasterizer();
        let err = r.rasterize(&RasterRequest::new("WWWWWWWW", 100_000.0)).err().unwrap();
        assert!(matches!(err, GlyphError::BitmapTooLarge { .. }));
    }
}
