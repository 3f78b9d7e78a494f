use glam::{Mat4, Vec3};

/// Look-at camera: eye position, target point and up vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInfo {
    pub eye: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 1.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl CameraInfo {
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.eye).normalize_or_zero()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    /// Distance from eye to target.
    pub fn distance(&self) -> f32 {
        self.eye.distance(self.look_at)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.look_at, self.up)
    }
}

/// Projection parameters. Depth maps to `0..1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov: f32,
        near: f32,
        /// `None` projects to infinity.
        far: Option<f32>,
    },
    Orthographic {
        /// Visible world-space height; width follows the aspect ratio.
        height: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.01,
            far: None,
        }
    }
}

impl Projection {
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov,
                near,
                far: None,
            } => Mat4::perspective_infinite_rh(fov, aspect, near),
            Projection::Perspective {
                fov,
                near,
                far: Some(far),
            } => Mat4::perspective_rh(fov, aspect, near, far),
            Projection::Orthographic { height, near, far } => {
                let half_h = height * 0.5;
                let half_w = half_h * aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }

    /// Vertical field of view, if perspective.
    pub fn fov(&self) -> Option<f32> {
        match self {
            Projection::Perspective { fov, .. } => Some(*fov),
            Projection::Orthographic { .. } => None,
        }
    }
}

/// Mutable camera and projection state of a world.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenConfig {
    pub camera: CameraInfo,
    pub projection: Projection,
}
