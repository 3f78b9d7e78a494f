use glam::Mat4;

/// A matrix plus whether it changed since the end of the last frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixInfo {
    pub mat: Mat4,
    pub dirty: bool,
}

impl Default for MatrixInfo {
    fn default() -> Self {
        Self {
            mat: Mat4::IDENTITY,
            dirty: true,
        }
    }
}

impl MatrixInfo {
    pub fn set(&mut self, mat: Mat4) {
        self.mat = mat;
        self.dirty = true;
    }
}

/// Camera, projection and their product, shared read-only with every batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldMatrices {
    pub camera: MatrixInfo,
    pub projection: MatrixInfo,
    pub transformation: MatrixInfo,
}

impl WorldMatrices {
    pub fn needs_transform(&self) -> bool {
        self.camera.dirty || self.projection.dirty
    }

    /// transformation = projection * camera.
    pub fn refresh_transform(&mut self) {
        self.transformation.set(self.projection.mat * self.camera.mat);
    }

    pub fn clear_dirty(&mut self) {
        self.camera.dirty = false;
        self.projection.dirty = false;
        self.transformation.dirty = false;
    }
}
