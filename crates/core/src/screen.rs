use cubetext_common::SizeConfig;
use cubetext_render::{CameraInfo, Projection, ScreenConfig};

/// Camera state plugins may edit, plus sizes they may only read.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeTextScreen {
    pub camera: CameraInfo,
    pub projection: Projection,
    text_size: SizeConfig,
    computed_size: SizeConfig,
    screen_size: SizeConfig,
}

impl CubeTextScreen {
    pub(crate) fn new(screen: ScreenConfig, screen_size: SizeConfig) -> Self {
        Self {
            camera: screen.camera,
            projection: screen.projection,
            text_size: SizeConfig::default(),
            computed_size: SizeConfig::default(),
            screen_size,
        }
    }

    /// Bitmap width and inked row count of the current text, in pixels.
    pub fn text_size(&self) -> SizeConfig {
        self.text_size
    }

    /// World-space footprint of the current text.
    pub fn computed_size(&self) -> SizeConfig {
        self.computed_size
    }

    /// Logical size of the surface.
    pub fn screen_size(&self) -> SizeConfig {
        self.screen_size
    }

    pub fn screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            camera: self.camera,
            projection: self.projection,
        }
    }

    pub(crate) fn set_text_sizes(&mut self, text: SizeConfig, computed: SizeConfig) {
        self.text_size = text;
        self.computed_size = computed;
    }

    pub(crate) fn set_screen_size(&mut self, size: SizeConfig) {
        self.screen_size = size;
    }
}
