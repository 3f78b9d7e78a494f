use serde::{Deserialize, Serialize};

/// Linear RGBA color, each channel in `0.0..=1.0`.
pub type Color = [f32; 4];

/// A point in world space as three plain floats (the layout the GPU expects).
pub type Coordinate = [f32; 3];

/// Identifier of one logical instance (one cube) inside a render batch.
///
/// Keys are assigned by whoever owns the batch. Cube text numbers its cubes
/// from 1 and restarts the count each time the text is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey(pub u32);

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Width/height pair used for bitmap, layout and screen sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeConfig {
    pub width: f32,
    pub height: f32,
}

impl SizeConfig {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width divided by height, or 1.0 for a degenerate (zero-height) size.
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Scale both axes uniformly.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_guards_zero_height() {
        assert_eq!(SizeConfig::new(4.0, 0.0).aspect(), 1.0);
        assert_eq!(SizeConfig::new(4.0, 2.0).aspect(), 2.0);
    }

    #[test]
    fn instance_key_display() {
        assert_eq!(InstanceKey(7).to_string(), "#7");
    }
}
