use crate::cube_text::OriginCubes;
use crate::layout::{CubeInfo, CubePosition};
use crate::screen::CubeTextScreen;
use crate::PluginError;
use cubetext_render::CubeInstances;

/// Timing of one frame, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Time since the previous frame.
    pub delta: f32,
    /// Absolute frame time.
    pub time: f32,
}

/// Runs once per cube as it is created, before it reaches the batch.
pub trait InitCubePlugin {
    fn init_cube(
        &mut self,
        cube: &mut CubeInfo,
        position: &CubePosition,
    ) -> Result<(), PluginError>;

    fn rewind(&mut self) {}
}

/// Runs every frame against the live cubes. Returns whether it wrote anything.
pub trait RenderPlugin {
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        screen: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError>;

    /// Reset accumulated time so the animation plays again.
    fn rewind(&mut self) {}
}

/// Runs every frame against the camera. Returns whether it changed anything.
pub trait CameraPlugin {
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError>;

    /// Reset accumulated time so the animation plays again.
    fn rewind(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    InitCube,
    Render,
    Camera,
}

/// Handle returned by registration, used to unregister one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(u64);

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plugin-{}", self.0)
    }
}

/// A plugin bound to its extension point.
pub enum Plugin {
    InitCube(Box<dyn InitCubePlugin>),
    Render(Box<dyn RenderPlugin>),
    Camera(Box<dyn CameraPlugin>),
}

impl Plugin {
    pub fn init_cube(plugin: impl InitCubePlugin + 'static) -> Self {
        Plugin::InitCube(Box::new(plugin))
    }

    pub fn render(plugin: impl RenderPlugin + 'static) -> Self {
        Plugin::Render(Box::new(plugin))
    }

    pub fn camera(plugin: impl CameraPlugin + 'static) -> Self {
        Plugin::Camera(Box::new(plugin))
    }

    pub fn extension_point(&self) -> ExtensionPoint {
        match self {
            Plugin::InitCube(_) => ExtensionPoint::InitCube,
            Plugin::Render(_) => ExtensionPoint::Render,
            Plugin::Camera(_) => ExtensionPoint::Camera,
        }
    }
}

/// Closure adapter returned by [`init_cube_fn`].
pub struct InitCubeFn<F>(F);

impl<F> InitCubePlugin for InitCubeFn<F>
where
    F: FnMut(&mut CubeInfo, &CubePosition) -> Result<(), PluginError>,
{
    fn init_cube(
        &mut self,
        cube: &mut CubeInfo,
        position: &CubePosition,
    ) -> Result<(), PluginError> {
        (self.0)(cube, position)
    }
}

pub fn init_cube_fn<F>(f: F) -> InitCubeFn<F>
where
    F: FnMut(&mut CubeInfo, &CubePosition) -> Result<(), PluginError>,
{
    InitCubeFn(f)
}

/// Closure adapter returned by [`render_fn`].
pub struct RenderFn<F>(F);

impl<F> RenderPlugin for RenderFn<F>
where
    F: FnMut(
        &OriginCubes,
        &mut CubeInstances<'_>,
        &CubeTextScreen,
        FrameTime,
    ) -> Result<bool, PluginError>,
{
    fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        screen: &CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        (self.0)(origin, cubes, screen, time)
    }
}

pub fn render_fn<F>(f: F) -> RenderFn<F>
where
    F: FnMut(
        &OriginCubes,
        &mut CubeInstances<'_>,
        &CubeTextScreen,
        FrameTime,
    ) -> Result<bool, PluginError>,
{
    RenderFn(f)
}

/// Closure adapter returned by [`camera_fn`].
pub struct CameraFn<F>(F);

impl<F> CameraPlugin for CameraFn<F>
where
    F: FnMut(&mut CubeTextScreen, FrameTime) -> Result<bool, PluginError>,
{
    fn render_camera(
        &mut self,
        screen: &mut CubeTextScreen,
        time: FrameTime,
    ) -> Result<bool, PluginError> {
        (self.0)(screen, time)
    }
}

pub fn camera_fn<F>(f: F) -> CameraFn<F>
where
    F: FnMut(&mut CubeTextScreen, FrameTime) -> Result<bool, PluginError>,
{
    CameraFn(f)
}

/// Registered plugins per extension point, in registration order.
#[derive(Default)]
pub(crate) struct PluginRegistry {
    next_id: u64,
    init_cube: Vec<(PluginId, Box<dyn InitCubePlugin>)>,
    render: Vec<(PluginId, Box<dyn RenderPlugin>)>,
    camera: Vec<(PluginId, Box<dyn CameraPlugin>)>,
}

impl PluginRegistry {
    pub fn register(&mut self, plugin: Plugin) -> PluginId {
        self.next_id += 1;
        let id = PluginId(self.next_id);
        let point = plugin.extension_point();
        match plugin {
            Plugin::InitCube(p) => self.init_cube.push((id, p)),
            Plugin::Render(p) => self.render.push((id, p)),
            Plugin::Camera(p) => self.camera.push((id, p)),
        }
        tracing::debug!(plugin = %id, ?point, "plugin registered");
        id
    }

    /// Remove one plugin, or every plugin of `point` with `None`. Returns how
    /// many were removed.
    pub fn unregister(&mut self, point: ExtensionPoint, id: Option<PluginId>) -> usize {
        fn remove<T>(list: &mut Vec<(PluginId, T)>, id: Option<PluginId>) -> usize {
            let before = list.len();
            match id {
                Some(id) => list.retain(|(p, _)| *p != id),
                None => list.clear(),
            }
            before - list.len()
        }
        match point {
            ExtensionPoint::InitCube => remove(&mut self.init_cube, id),
            ExtensionPoint::Render => remove(&mut self.render, id),
            ExtensionPoint::Camera => remove(&mut self.camera, id),
        }
    }

    pub fn len(&self, point: ExtensionPoint) -> usize {
        match point {
            ExtensionPoint::InitCube => self.init_cube.len(),
            ExtensionPoint::Render => self.render.len(),
            ExtensionPoint::Camera => self.camera.len(),
        }
    }

    pub fn clear(&mut self) {
        self.init_cube.clear();
        self.render.clear();
        self.camera.clear();
    }

    pub fn rewind(&mut self) {
        self.init_cube.iter_mut().for_each(|(_, p)| p.rewind());
        self.render.iter_mut().for_each(|(_, p)| p.rewind());
        self.camera.iter_mut().for_each(|(_, p)| p.rewind());
    }

    pub fn init_cube(&mut self, cube: &mut CubeInfo, position: &CubePosition) {
        for (id, plugin) in &mut self.init_cube {
            if let Err(err) = plugin.init_cube(cube, position) {
                tracing::warn!(
                    plugin = %id,
                    cube = cube.id,
                    error = %err,
                    "init-cube plugin failed; skipped"
                );
            }
        }
    }

    /// Run every render plugin. True if any reported a write.
    pub fn render(
        &mut self,
        origin: &OriginCubes,
        cubes: &mut CubeInstances<'_>,
        screen: &CubeTextScreen,
        time: FrameTime,
    ) -> bool {
        let mut wrote = false;
        for (id, plugin) in &mut self.render {
            match plugin.render(origin, cubes, screen, time) {
                Ok(w) => wrote |= w,
                Err(err) => tracing::warn!(
                    plugin = %id,
                    error = %err,
                    "render plugin failed; skipped this frame"
                ),
            }
        }
        wrote
    }

    /// Run every camera plugin. True if any changed the camera.
    pub fn camera(&mut self, screen: &mut CubeTextScreen, time: FrameTime) -> bool {
        let mut changed = false;
        for (id, plugin) in &mut self.camera {
            match plugin.render_camera(screen, time) {
                Ok(c) => changed |= c,
                Err(err) => tracing::warn!(
                    plugin = %id,
                    error = %err,
                    "camera plugin failed; skipped this frame"
                ),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubetext_common::SizeConfig;
    use cubetext_render::ScreenConfig;
    use glam::Vec3;

    fn screen() -> CubeTextScreen {
        CubeTextScreen::new(ScreenConfig::default(), SizeConfig::new(100.0, 100.0))
    }

    #[test]
    fn camera_plugins_compose_in_order() {
        let mut registry = PluginRegistry::default();
        registry.register(Plugin::camera(camera_fn(|s, _| {
            s.camera.eye.x = 1.0;
            Ok(true)
        })));
        registry.register(Plugin::camera(camera_fn(|s, _| {
            s.camera.eye.x *= 3.0;
            Ok(false)
        })));
        let mut s = screen();
        assert!(registry.camera(&mut s, FrameTime::default()));
        assert_eq!(s.camera.eye.x, 3.0);
    }

    #[test]
    fn failing_plugin_is_skipped() {
        let mut registry = PluginRegistry::default();
        registry.register(Plugin::camera(camera_fn(|_, _| {
            Err(PluginError::Failed("boom".into()))
        })));
        registry.register(Plugin::camera(camera_fn(|s, _| {
            s.camera.eye = Vec3::new(0.0, 0.0, 5.0);
            Ok(true)
        })));
        let mut s = screen();
        assert!(registry.camera(&mut s, FrameTime::default()));
        assert_eq!(s.camera.eye.z, 5.0);
    }

    #[test]
    fn false_from_every_plugin_means_unchanged() {
        let mut registry = PluginRegistry::default();
        registry.register(Plugin::camera(camera_fn(|_, _| Ok(false))));
        assert!(!registry.camera(&mut screen(), FrameTime::default()));
    }

    #[test]
    fn unregister_one_or_all() {
        let mut registry = PluginRegistry::default();
        let first = registry.register(Plugin::camera(camera_fn(|_, _| Ok(false))));
        registry.register(Plugin::camera(camera_fn(|_, _| Ok(false))));
        registry.register(Plugin::init_cube(init_cube_fn(|_, _| Ok(()))));

        assert_eq!(registry.unregister(ExtensionPoint::Camera, Some(first)), 1);
        assert_eq!(registry.unregister(ExtensionPoint::Camera, Some(first)), 0);
        assert_eq!(registry.len(ExtensionPoint::Camera), 1);
        assert_eq!(registry.unregister(ExtensionPoint::Camera, None), 1);
        assert_eq!(registry.len(ExtensionPoint::InitCube), 1);
        assert_ne!(first.to_string(), "");
    }
}
