use crate::GlyphError;

/// Row-major alpha coverage, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl GlyphBitmap {
    pub fn new(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self, GlyphError> {
        if alpha.len() != (width as usize) * (height as usize) {
            return Err(GlyphError::InvalidBitmap);
        }
        Ok(Self { width, height, alpha })
    }

    pub(crate) fn from_parts(width: u32, height: u32, alpha: Vec<u8>) -> Self {
        debug_assert_eq!(alpha.len(), (width as usize) * (height as usize));
        Self { width, height, alpha }
    }

    /// Take the alpha channel of RGBA8 pixel data.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, GlyphError> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(GlyphError::InvalidBitmap);
        }
        let alpha = rgba.chunks_exact(4).map(|px| px[3]).collect();
        Self::new(width, height, alpha)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.alpha
    }

    /// Alpha at `(x, y)`, 0 outside the bitmap.
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[(y * self.width + x) as usize]
    }

    /// `(x, y, alpha)` in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, u8)> + '_ {
        let width = self.width.max(1);
        self.alpha
            .iter()
            .enumerate()
            .map(move |(i, a)| (i as u32 % width, i as u32 / width, *a))
    }

    /// Keep only covered pixels that touch an uncovered 4-neighbour or the border.
    ///
    /// A pixel is covered when its alpha is above `threshold`.
    pub fn edges(&self, threshold: u8) -> Self {
        let open = |x: u32, y: u32| self.alpha(x, y) <= threshold;
        let mut alpha = vec![0; self.alpha.len()];
        for (x, y, a) in self.pixels() {
            if a <= threshold {
                continue;
            }
            let on_edge = x == 0
                || y == 0
                || x + 1 == self.width
                || y + 1 == self.height
                || open(x - 1, y)
                || open(x + 1, y)
                || open(x, y - 1)
                || open(x, y + 1);
            if on_edge {
                alpha[(y * self.width + x) as usize] = a;
            }
        }
        Self {
            width: self.width,
            height: self.height,
            alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: u32) -> GlyphBitmap {
        GlyphBitmap::new(n, n, vec![255; (n * n) as usize]).unwrap()
    }

    #[test]
    fn dimensions_are_checked() {
        assert!(matches!(GlyphBitmap::new(2, 2, vec![0; 3]), Err(GlyphError::InvalidBitmap)));
        assert!(GlyphBitmap::from_rgba(1, 1, &[0, 0, 0, 9]).is_ok());
    }

    #[test]
    fn rgba_keeps_alpha_only() {
        let b = GlyphBitmap::from_rgba(2, 1, &[1, 2, 3, 40, 5, 6, 7, 80]).unwrap();
        assert_eq!(b.data(), &[40, 80]);
    }

    #[test]
    fn pixels_follow_raster_order() {
        let b = GlyphBitmap::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        let px: Vec<_> = b.pixels().collect();
        assert_eq!(px, vec![(0, 0, 1), (1, 0, 2), (0, 1, 3), (1, 1, 4)]);
        assert_eq!(b.alpha(5, 0), 0);
    }

    #[test]
    fn edges_hollow_out_a_filled_square() {
        let e = square(4).edges(0);
        assert_eq!(e.alpha(1, 1), 0);
        assert_eq!(e.alpha(2, 2), 0);
        assert_eq!(e.alpha(0, 1), 255);
        assert_eq!(e.data().iter().filter(|a| **a > 0).count(), 12);
    }

    #[test]
    fn faint_rim_does_not_hide_the_outline() {
        // A solid 3x3 block inside a 5x5 ring of anti-aliasing fringe.
        let mut alpha = vec![4u8; 25];
        for y in 1..4 {
            for x in 1..4 {
                alpha[y * 5 + x] = 255;
            }
        }
        let b = GlyphBitmap::new(5, 5, alpha).unwrap();

        let e = b.edges(10);
        let kept: Vec<_> = e.pixels().filter(|&(_, _, a)| a > 10).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(kept.len(), 8);
        assert!(!kept.contains(&(2, 2)));
        assert_eq!(e.alpha(0, 0), 0);

        // Counting the fringe as covered turns the block into interior.
        let naive = b.edges(0);
        assert_eq!(naive.alpha(1, 1), 0);
        assert_eq!(naive.alpha(0, 0), 4);
    }
}
