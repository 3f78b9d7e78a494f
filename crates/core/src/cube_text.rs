use crate::layout::{CubeInfo, TextLayout, layout_bitmap};
use crate::options::{CubeOptions, PlatformQuirks, TextOptions};
use crate::plugin::{ExtensionPoint, FrameTime, Plugin, PluginId, PluginRegistry};
use crate::scheduler::{FrameScheduler, ManualScheduler};
use crate::screen::CubeTextScreen;
use crate::{CubeTextError, DEFAULT_THRESHOLD};
use cubetext_common::{InstanceKey, SizeConfig, VectorMap};
use cubetext_glyph::{
    FontFamily, GlyphBitmap, GlyphRasterizer, PendingGlyphs, RasterRequest, Rasterization,
};
use cubetext_render::{
    BatchId, CubeAttributes, CubeBatch, CubeBatchConfig, GpuBackend, RenderError, ResizeEntry,
    World, WorldConfig,
};
use glam::{Mat4, Vec3};

/// Cubes as created, grouped by bitmap level (rows counted from the bottom).
pub type OriginCubes = VectorMap<u32, Vec<CubeInfo>>;

/// Construction options of a [`CubeText`].
#[derive(Debug, Clone)]
pub struct CubeTextConfig {
    pub world: WorldConfig,
    pub batch: CubeBatchConfig,
    /// Pixels with alpha at or below this produce no cube.
    pub threshold: u8,
    pub quirks: PlatformQuirks,
}

impl Default for CubeTextConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            batch: CubeBatchConfig::default(),
            threshold: DEFAULT_THRESHOLD,
            quirks: PlatformQuirks::default(),
        }
    }
}

/// Text waiting on a background font load.
struct PendingText {
    glyphs: PendingGlyphs,
    options: CubeOptions,
}

/// Text rendered as cubes, animated by registered plugins.
///
/// Owns the world (and through it the GPU backend and the cube batch), the
/// rasterizer that turns strings into bitmaps, and the scheduler that asks
/// the platform for frames.
pub struct CubeText<G: GpuBackend, R: GlyphRasterizer, S: FrameScheduler = ManualScheduler> {
    world: World<G>,
    rasterizer: R,
    scheduler: S,
    plugins: PluginRegistry,
    origin: OriginCubes,
    screen: CubeTextScreen,
    text_center: Vec3,
    threshold: u8,
    quirks: PlatformQuirks,
    next_key: u32,
    pending: Option<PendingText>,
    running: bool,
    prev_time: f32,
}

impl<G: GpuBackend, R: GlyphRasterizer, S: FrameScheduler> CubeText<G, R, S> {
    /// Build the world inside a parent surface of logical size `parent` and
    /// register the cube batch.
    pub fn new(
        gpu: G,
        rasterizer: R,
        scheduler: S,
        parent: SizeConfig,
        config: CubeTextConfig,
    ) -> Result<Self, CubeTextError> {
        let mut world = World::new(gpu, config.world);
        world.attach(parent);
        world.set_auto_resize(true)?;
        world.add_batch(CubeBatch::new(config.batch))?;
        let screen = CubeTextScreen::new(*world.screen_config(), parent);
        Ok(Self {
            world,
            rasterizer,
            scheduler,
            plugins: PluginRegistry::default(),
            origin: OriginCubes::new(),
            screen,
            text_center: Vec3::ZERO,
            threshold: config.threshold,
            quirks: config.quirks,
            next_key: 0,
            pending: None,
            running: false,
            prev_time: 0.0,
        })
    }

    pub fn world(&self) -> &World<G> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World<G> {
        &mut self.world
    }

    pub fn screen(&self) -> &CubeTextScreen {
        &self.screen
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn cubes(&self) -> Option<&CubeBatch> {
        self.world.batch::<CubeBatch>(CubeBatch::ID)
    }

    pub fn origin_cubes(&self) -> &OriginCubes {
        &self.origin
    }

    /// Text width in bitmap pixels.
    pub fn text_width(&self) -> f32 {
        self.screen.text_size().width
    }

    /// Inked rows of the text in bitmap pixels.
    pub fn text_height(&self) -> f32 {
        self.screen.text_size().height
    }

    /// World-space centre of the current text.
    pub fn text_center(&self) -> Vec3 {
        self.text_center
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Takes effect at the next `draw_text`.
    pub fn set_threshold(&mut self, threshold: u8) {
        self.threshold = threshold;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a font family is still loading for the last `draw_text`.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn register(&mut self, plugin: Plugin) -> PluginId {
        self.plugins.register(plugin)
    }

    /// Remove one plugin, or every plugin of `point` with `None`.
    pub fn unregister(&mut self, point: ExtensionPoint, id: Option<PluginId>) -> usize {
        self.plugins.unregister(point, id)
    }

    pub fn plugin_count(&self, point: ExtensionPoint) -> usize {
        self.plugins.len(point)
    }

    /// Restart every registered plugin's animation.
    pub fn rewind_plugins(&mut self) {
        self.plugins.rewind();
    }

    /// Restart frame time at zero. The next `frame` sees its time as the delta.
    pub fn reset_clock(&mut self) {
        self.prev_time = 0.0;
    }

    /// Pointer position in logical pixels, used for picking.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.world.set_pointer(x, y);
    }

    /// Forward a surface size change. Returns whether it was applied.
    pub fn notify_resize(&mut self, entry: ResizeEntry) -> Result<bool, CubeTextError> {
        let applied = self.world.notify_resize(entry)?;
        if applied {
            self.screen.set_screen_size(self.world.client_size());
        }
        Ok(applied)
    }

    /// Replace the current text.
    ///
    /// The old cubes are cleared first. With the default font the new cubes
    /// exist on return; with a `family` that is still loading they appear at
    /// the first frame after the load completes. A newer call supersedes a
    /// pending one.
    pub fn draw_text(
        &mut self,
        text: &str,
        text_options: &TextOptions,
        cube_options: &CubeOptions,
        family: Option<FontFamily>,
    ) -> Result<(), CubeTextError> {
        if text.is_empty() {
            return Err(CubeTextError::EmptyText);
        }
        if !text_options.size.is_finite() || text_options.size <= 0.0 {
            return Err(CubeTextError::ZeroFontSize);
        }
        self.clear_cubes();

        let request = RasterRequest {
            text: text.to_owned(),
            size: text_options.size,
            style: text_options.style.clone(),
            draw_type: cube_options.draw_type,
            threshold: self.threshold,
            family,
        };
        match self.rasterizer.rasterize(&request)? {
            Rasterization::Ready(bitmap) => self.populate(&bitmap, cube_options),
            Rasterization::Pending(glyphs) => {
                tracing::debug!(text, "waiting for font family");
                self.pending = Some(PendingText {
                    glyphs,
                    options: cube_options.clone(),
                });
                Ok(())
            }
        }
    }

    /// Populate the batch if a pending rasterization has arrived. Returns
    /// whether it did.
    pub fn poll_pending(&mut self) -> Result<bool, CubeTextError> {
        let Some(result) = self.pending.as_mut().and_then(|p| p.glyphs.try_take()) else {
            return Ok(false);
        };
        let Some(PendingText { options, .. }) = self.pending.take() else {
            return Ok(false);
        };
        let bitmap = result?;
        self.populate(&bitmap, &options)?;
        Ok(true)
    }

    /// Remove the current text.
    pub fn clear_text(&mut self) -> Result<(), CubeTextError> {
        if self.quirks.redraw_on_clear {
            let invisible = CubeOptions {
                size: 0.0,
                ..CubeOptions::default()
            };
            return self.draw_text(".", &TextOptions::default(), &invisible, None);
        }
        self.clear_cubes();
        Ok(())
    }

    /// Start requesting frames. Does nothing if already running.
    pub fn run(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        tracing::debug!("cube text loop started");
        self.scheduler.request_frame();
    }

    /// Stop the loop and withdraw any requested frame. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("cube text loop stopped");
        }
        self.running = false;
        self.scheduler.cancel();
    }

    /// Run one frame at absolute `time` (milliseconds).
    ///
    /// Order: pending text, render plugins, camera plugins, world render,
    /// next frame request. Returns the cube picked under the pointer.
    pub fn frame(&mut self, time: f32) -> Result<Option<(BatchId, InstanceKey)>, CubeTextError> {
        if !self.running {
            return Ok(None);
        }
        let _span = tracing::trace_span!("cube_text_frame", time).entered();
        self.poll_pending()?;

        let frame = FrameTime {
            delta: time - self.prev_time,
            time,
        };
        if let Some(batch) = self.world.batch_mut::<CubeBatch>(CubeBatch::ID) {
            let wrote = {
                let mut cubes = batch.instances();
                self.plugins.render(&self.origin, &mut cubes, &self.screen, frame)
            };
            if wrote {
                batch.request_full_upload();
            }
        }

        if self.plugins.camera(&mut self.screen, frame) {
            let projection_changed =
                self.world.screen_config().projection != self.screen.projection;
            *self.world.screen_config_mut() = self.screen.screen_config();
            self.world.refresh_camera();
            if projection_changed {
                self.world.refresh_projection();
            }
        }

        let picked = self.world.render()?;
        self.prev_time = time;
        self.scheduler.request_frame();
        Ok(picked)
    }

    /// Stop, release every cube, batch and plugin, and disable the world.
    pub fn destroy(&mut self) {
        self.stop();
        self.clear_cubes();
        self.world.remove_batch(None);
        self.world.detach();
        self.plugins.clear();
        self.world.set_disabled(true);
        tracing::debug!("cube text destroyed");
    }

    fn clear_cubes(&mut self) {
        self.world.clear();
        self.origin.clear();
        self.pending = None;
        self.next_key = 0;
        self.screen.set_text_sizes(SizeConfig::default(), SizeConfig::default());
        self.text_center = Vec3::ZERO;
    }

    fn populate(
        &mut self,
        bitmap: &GlyphBitmap,
        options: &CubeOptions,
    ) -> Result<(), CubeTextError> {
        let layout: TextLayout = layout_bitmap(bitmap, options, self.threshold);
        let batch = self
            .world
            .batch_mut::<CubeBatch>(CubeBatch::ID)
            .ok_or(RenderError::NotInitialized(CubeBatch::ID))?;

        for cell in layout.cubes() {
            self.next_key += 1;
            let mut cube = CubeInfo::new(self.next_key, cell, options.size);
            self.plugins.init_cube(&mut cube, &cell.position);
            batch.add(
                cube.key(),
                CubeAttributes {
                    color: cube.color,
                    position: cube.position.to_array(),
                    rotation: Mat4::from_quat(cube.rotation),
                    size: cube.size,
                },
            )?;
            let level = cell.position.level();
            match self.origin.get_mut(&level) {
                Some(row) => row.push(cube),
                None => {
                    self.origin.insert(level, vec![cube]);
                }
            }
        }

        self.screen.set_text_sizes(layout.text_size(), layout.computed_size());
        self.text_center = layout.center();
        tracing::debug!(
            cubes = layout.cubes().len(),
            width = bitmap.width(),
            height = bitmap.height(),
            "text populated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PluginError;
    use crate::plugin::{camera_fn, init_cube_fn, render_fn};
    use cubetext_glyph::GlyphError;
    use cubetext_render::{FramebufferStatus, GpuCall, HeadlessBackend};
    use std::sync::mpsc::{self, Receiver, Sender};

    /// A 5x5 "A": apex, two legs and a crossbar.
    fn letter_a() -> GlyphBitmap {
        #[rustfmt::skip]
        let alpha = vec![
            0,   0,   255, 0,   0,
            0,   255, 0,   255, 0,
            255, 255, 255, 255, 255,
            255, 0,   0,   0,   255,
            255, 0,   0,   0,   255,
        ];
        GlyphBitmap::new(5, 5, alpha).unwrap()
    }

    /// Rasterizer returning a fixed bitmap, or a pending load when armed.
    struct FakeRasterizer {
        bitmap: GlyphBitmap,
        pending: Option<Receiver<Result<GlyphBitmap, GlyphError>>>,
        requests: Vec<RasterRequest>,
    }

    impl FakeRasterizer {
        fn new(bitmap: GlyphBitmap) -> Self {
            Self {
                bitmap,
                pending: None,
                requests: Vec::new(),
            }
        }

        fn arm(&mut self) -> Sender<Result<GlyphBitmap, GlyphError>> {
            let (tx, rx) = mpsc::channel();
            self.pending = Some(rx);
            tx
        }
    }

    impl GlyphRasterizer for FakeRasterizer {
        fn rasterize(&mut self, request: &RasterRequest) -> Result<Rasterization, GlyphError> {
            self.requests.push(request.clone());
            Ok(match self.pending.take() {
                Some(rx) => Rasterization::Pending(PendingGlyphs::new(rx)),
                None => Rasterization::Ready(self.bitmap.clone()),
            })
        }
    }

    type TestText = CubeText<HeadlessBackend, FakeRasterizer>;

    fn cube_text(bitmap: GlyphBitmap) -> TestText {
        CubeText::new(
            HeadlessBackend::new(200, 100),
            FakeRasterizer::new(bitmap),
            ManualScheduler::new(),
            SizeConfig::new(200.0, 100.0),
            CubeTextConfig::default(),
        )
        .unwrap()
    }

    fn draw(ct: &mut TestText, text: &str) -> Result<(), CubeTextError> {
        ct.draw_text(text, &TextOptions::default(), &CubeOptions::default(), None)
    }

    fn batch(ct: &TestText) -> &CubeBatch {
        ct.cubes().unwrap()
    }

    #[test]
    fn draw_then_clear_leaves_nothing() {
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        assert_eq!(batch(&ct).len(), 12);
        assert_eq!(batch(&ct).id_count(), 12);
        assert_eq!(ct.origin_cubes().len(), 5);
        assert_eq!(ct.text_width(), 5.0);
        assert_eq!(ct.text_height(), 5.0);

        ct.clear_text().unwrap();
        assert_eq!(batch(&ct).len(), 0);
        assert_eq!(batch(&ct).id_count(), 0);
        assert!(ct.origin_cubes().is_empty());
        assert_eq!(ct.text_width(), 0.0);
    }

    #[test]
    fn precondition_errors() {
        let mut ct = cube_text(letter_a());
        assert!(matches!(draw(&mut ct, ""), Err(CubeTextError::EmptyText)));
        let zero = TextOptions {
            size: 0.0,
            ..TextOptions::default()
        };
        assert!(matches!(
            ct.draw_text("A", &zero, &CubeOptions::default(), None),
            Err(CubeTextError::ZeroFontSize)
        ));
    }

    #[test]
    fn non_finite_font_size_is_rejected() {
        let mut ct = cube_text(letter_a());
        for size in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let options = TextOptions {
                size,
                ..TextOptions::default()
            };
            assert!(matches!(
                ct.draw_text("A", &options, &CubeOptions::default(), None),
                Err(CubeTextError::ZeroFontSize)
            ));
        }
        assert!(ct.rasterizer.requests.is_empty());
    }

    #[test]
    fn request_carries_threshold() {
        let mut ct = cube_text(letter_a());
        ct.set_threshold(42);
        draw(&mut ct, "A").unwrap();
        assert_eq!(ct.rasterizer.requests[0].threshold, 42);
    }

    #[test]
    fn redraw_replaces_previous_text() {
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        draw(&mut ct, "A").unwrap();
        assert_eq!(batch(&ct).len(), 12);
        let cubes: usize = ct.origin_cubes().values().map(Vec::len).sum();
        assert_eq!(cubes, 12);

        // Keys restart at 1 for each new text.
        let cubes = ct.world_mut().batch_mut::<CubeBatch>(CubeBatch::ID).unwrap();
        assert!(cubes.instances().position(InstanceKey(1)).is_some());
        assert!(cubes.instances().position(InstanceKey(13)).is_none());
    }

    #[test]
    fn request_carries_options() {
        let mut ct = cube_text(letter_a());
        let text = TextOptions {
            size: 32.0,
            style: "italic".into(),
        };
        let cubes = CubeOptions {
            draw_type: cubetext_glyph::DrawType::Stroke,
            ..CubeOptions::default()
        };
        ct.draw_text("Hi", &text, &cubes, None).unwrap();
        let request = &ct.rasterizer.requests[0];
        assert_eq!(request.text, "Hi");
        assert_eq!(request.size, 32.0);
        assert!(request.is_oblique());
        assert_eq!(request.draw_type, cubetext_glyph::DrawType::Stroke);
    }

    #[test]
    fn single_pixel_lands_on_origin() {
        let mut ct = cube_text(GlyphBitmap::new(1, 1, vec![255]).unwrap());
        draw(&mut ct, ".").unwrap();
        let cube = &ct.origin_cubes().values().next().unwrap()[0];
        assert_eq!(cube.position, Vec3::ZERO);
        assert_eq!(ct.text_center(), Vec3::ZERO);
    }

    #[test]
    fn init_cube_plugins_shape_committed_cubes() {
        let mut ct = cube_text(GlyphBitmap::new(1, 1, vec![255]).unwrap());
        ct.register(Plugin::init_cube(init_cube_fn(|cube, _| {
            cube.position.z = 9.0;
            Ok(())
        })));
        draw(&mut ct, ".").unwrap();
        let cube = &ct.origin_cubes().values().next().unwrap()[0];
        assert_eq!(cube.position.z, 9.0);
        assert_eq!(cube.origin.position.z, 0.0);
        let key = cube.key();
        let mut z = None;
        ct.world_mut()
            .batch_mut::<CubeBatch>(CubeBatch::ID)
            .unwrap()
            .cube_attr(key, "a_position", |p| {
                z = Some(p[2]);
                false
            });
        assert_eq!(z, Some(9.0));
    }

    #[test]
    fn stop_twice_schedules_nothing() {
        let mut ct = cube_text(letter_a());
        ct.run();
        ct.run();
        assert_eq!(ct.scheduler().requests(), 1);
        ct.stop();
        ct.stop();
        assert!(!ct.scheduler().is_pending());
        assert_eq!(ct.frame(16.0).unwrap(), None);
        assert_eq!(ct.scheduler().requests(), 1);
        assert!(ct.world().gpu().draws().is_empty());
    }

    #[test]
    fn frame_requests_the_next_one() {
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        ct.run();
        assert!(ct.scheduler_mut().take());
        ct.frame(16.0).unwrap();
        assert!(ct.scheduler_mut().take());
        assert_eq!(ct.world().gpu().draws(), vec![(36, 12), (36, 12)]);
    }

    #[test]
    fn render_plugin_write_forces_full_upload() {
        let uploads = |ct: &TestText| {
            ct.world()
                .gpu()
                .calls()
                .iter()
                .filter(|c| {
                    matches!(c, GpuCall::UpdateBuffer { .. } | GpuCall::RespecifyBuffer { .. })
                })
                .count()
        };
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        ct.run();
        ct.frame(16.0).unwrap();

        // Nothing dirty and no plugin: nothing goes up.
        ct.world_mut().gpu_mut().clear_calls();
        ct.frame(32.0).unwrap();
        assert_eq!(uploads(&ct), 0);

        // A plugin reporting a write forces every attribute up.
        ct.register(Plugin::render(render_fn(|_, _, _, _| Ok(true))));
        ct.world_mut().gpu_mut().clear_calls();
        ct.frame(48.0).unwrap();
        assert_eq!(uploads(&ct), 6);
    }

    #[test]
    fn render_plugins_see_frame_delta() {
        let mut ct = cube_text(letter_a());
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        ct.register(Plugin::render(render_fn(move |_, _, _, time| {
            sink.borrow_mut().push(time.delta);
            Ok(false)
        })));
        ct.run();
        ct.frame(10.0).unwrap();
        ct.frame(25.0).unwrap();
        assert_eq!(*seen.borrow(), vec![10.0, 15.0]);
    }

    #[test]
    fn reset_clock_restarts_delta() {
        let mut ct = cube_text(letter_a());
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        ct.register(Plugin::camera(camera_fn(move |_, time| {
            sink.borrow_mut().push(time.delta);
            Ok(false)
        })));
        ct.run();
        ct.frame(5000.0).unwrap();
        ct.reset_clock();
        ct.frame(16.0).unwrap();
        assert_eq!(*seen.borrow(), vec![5000.0, 16.0]);
    }

    #[test]
    fn camera_change_refreshes_camera_matrix() {
        let mut ct = cube_text(letter_a());
        ct.register(Plugin::camera(camera_fn(|screen, _| {
            screen.camera.eye = Vec3::new(0.0, 0.0, 42.0);
            Ok(true)
        })));
        ct.run();
        ct.frame(16.0).unwrap();
        assert_eq!(ct.world().screen_config().camera.eye.z, 42.0);
    }

    #[test]
    fn failing_plugin_does_not_stop_the_frame() {
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        ct.register(Plugin::render(render_fn(|_, _, _, _| {
            Err(PluginError::Failed("nope".into()))
        })));
        ct.run();
        ct.frame(16.0).unwrap();
        assert_eq!(ct.world().gpu().draws().len(), 2);
    }

    #[test]
    fn pending_font_populates_on_a_later_frame() {
        let mut ct = cube_text(letter_a());
        let tx = ct.rasterizer.arm();
        let family = FontFamily {
            name: "Slow".into(),
            uri: "slow.ttf".into(),
        };
        ct.draw_text("A", &TextOptions::default(), &CubeOptions::default(), Some(family))
            .unwrap();
        assert!(ct.is_pending());
        assert!(batch(&ct).is_empty());

        ct.run();
        ct.frame(16.0).unwrap();
        assert!(batch(&ct).is_empty());

        tx.send(Ok(letter_a())).unwrap();
        ct.frame(32.0).unwrap();
        assert!(!ct.is_pending());
        assert_eq!(batch(&ct).len(), 12);
    }

    #[test]
    fn newer_draw_supersedes_pending() {
        let mut ct = cube_text(letter_a());
        let tx = ct.rasterizer.arm();
        let family = FontFamily {
            name: "Slow".into(),
            uri: "slow.ttf".into(),
        };
        ct.draw_text("A", &TextOptions::default(), &CubeOptions::default(), Some(family))
            .unwrap();
        draw(&mut ct, "A").unwrap();
        assert!(!ct.is_pending());
        let _ = tx.send(Ok(letter_a()));
        assert!(!ct.poll_pending().unwrap());
        assert_eq!(batch(&ct).len(), 12);
    }

    #[test]
    fn failed_font_load_surfaces_once() {
        let mut ct = cube_text(letter_a());
        let tx = ct.rasterizer.arm();
        let family = FontFamily {
            name: "Broken".into(),
            uri: "broken.ttf".into(),
        };
        ct.draw_text("A", &TextOptions::default(), &CubeOptions::default(), Some(family))
            .unwrap();
        tx.send(Err(GlyphError::InvalidFont)).unwrap();
        assert!(matches!(ct.poll_pending(), Err(CubeTextError::Glyph(GlyphError::InvalidFont))));
        assert!(!ct.poll_pending().unwrap());
    }

    #[test]
    fn platform_quirk_redraws_invisible_glyph() {
        let mut ct = CubeText::new(
            HeadlessBackend::new(10, 10),
            FakeRasterizer::new(GlyphBitmap::new(1, 1, vec![255]).unwrap()),
            ManualScheduler::new(),
            SizeConfig::new(10.0, 10.0),
            CubeTextConfig {
                quirks: PlatformQuirks { redraw_on_clear: true },
                ..CubeTextConfig::default()
            },
        )
        .unwrap();
        ct.clear_text().unwrap();
        assert_eq!(ct.rasterizer.requests.last().map(|r| r.text.as_str()), Some("."));
        let cube = &ct.origin_cubes().values().next().unwrap()[0];
        assert_eq!(cube.size, 0.0);
    }

    #[test]
    fn resize_updates_screen_size() {
        let mut ct = cube_text(letter_a());
        let applied = ct
            .notify_resize(ResizeEntry {
                device_pixel_size: Some((600, 300)),
                logical_size: SizeConfig::new(300.0, 150.0),
                device_pixel_ratio: 2.0,
            })
            .unwrap();
        assert!(applied);
        assert_eq!(ct.screen().screen_size(), SizeConfig::new(300.0, 150.0));
        assert_eq!(ct.world().gpu().target_size(), (600, 300));
    }

    #[test]
    fn picking_reports_the_cube_under_the_pointer() {
        let mut ct = cube_text(GlyphBitmap::new(1, 1, vec![255]).unwrap());
        draw(&mut ct, ".").unwrap();
        ct.world_mut().gpu_mut().set_pick_pixel([1, 0, 0, 0]);
        ct.set_pointer(100.0, 50.0);
        ct.run();
        assert_eq!(ct.frame(16.0).unwrap(), Some((CubeBatch::ID, InstanceKey(1))));
    }

    #[test]
    fn incomplete_target_skips_rendering() {
        let mut ct = cube_text(letter_a());
        ct.world_mut()
            .gpu_mut()
            .set_framebuffer_status(FramebufferStatus::IncompleteAttachment);
        ct.run();
        ct.frame(16.0).unwrap();
        assert!(ct.world().gpu().draws().is_empty());
        assert!(ct.scheduler().is_pending());
    }

    #[test]
    fn destroy_stops_and_disables() {
        let mut ct = cube_text(letter_a());
        draw(&mut ct, "A").unwrap();
        ct.register(Plugin::camera(camera_fn(|_, _| Ok(false))));
        ct.run();
        ct.destroy();
        assert!(!ct.is_running());
        assert!(ct.cubes().is_none());
        assert!(ct.world().is_disabled());
        assert!(!ct.world().is_attached());
        assert_eq!(ct.plugin_count(ExtensionPoint::Camera), 0);
        assert!(matches!(
            draw(&mut ct, "A"),
            Err(CubeTextError::Render(RenderError::NotInitialized(_)))
        ));
    }
}
