use crate::RenderError;
use crate::backend::{FramebufferStatus, GpuBackend, PassDesc, PassTarget};
use crate::batch::{BatchId, RenderBatch};
use crate::camera::{CameraInfo, Projection, ScreenConfig};
use crate::matrices::WorldMatrices;
use crate::picking::decode_pick_bytes;
use cubetext_common::{IdGenerator, InstanceKey, SizeConfig, VectorMap};

/// Construction options of a [`World`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub camera: CameraInfo,
    pub projection: Projection,
    /// Clear color of the visible pass. Transparent by default.
    pub clear_color: [f64; 4],
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            camera: CameraInfo::default(),
            projection: Projection::default(),
            clear_color: [0.0; 4],
        }
    }
}

/// One size-change notification for the surface's parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEntry {
    /// Exact device-pixel size, when the platform reports it.
    pub device_pixel_size: Option<(u32, u32)>,
    /// Logical (CSS-pixel) content size.
    pub logical_size: SizeConfig,
    pub device_pixel_ratio: f32,
}

impl ResizeEntry {
    pub fn device_pixels(&self) -> (u32, u32) {
        self.device_pixel_size.unwrap_or_else(|| {
            let scaled = self.logical_size.scaled(self.device_pixel_ratio);
            (scaled.width.round() as u32, scaled.height.round() as u32)
        })
    }
}

type ResizeCallback = Box<dyn FnMut(f32, f32)>;

/// Scene context: owns the backend, the batches, camera and projection state,
/// and the picking target.
pub struct World<G: GpuBackend> {
    gpu: G,
    batches: VectorMap<BatchId, Box<dyn RenderBatch>>,
    screen: ScreenConfig,
    matrices: WorldMatrices,
    ids: IdGenerator,
    clear_color: [f64; 4],
    attached: bool,
    auto_resize: bool,
    resizing: bool,
    last_rendered: Option<BatchId>,
    /// Logical size of the surface; the backend target holds the device size.
    client_size: SizeConfig,
    pointer: (f32, f32),
    disabled: bool,
    on_resize: Option<ResizeCallback>,
}

impl<G: GpuBackend> World<G> {
    pub fn new(gpu: G, config: WorldConfig) -> Self {
        let (width, height) = gpu.target_size();
        let mut world = Self {
            gpu,
            batches: VectorMap::new(),
            screen: ScreenConfig {
                camera: config.camera,
                projection: config.projection,
            },
            matrices: WorldMatrices::default(),
            ids: IdGenerator::new(),
            clear_color: config.clear_color,
            attached: false,
            auto_resize: false,
            resizing: false,
            last_rendered: None,
            client_size: SizeConfig::new(width as f32, height as f32),
            pointer: (-1.0, -1.0),
            disabled: false,
            on_resize: None,
        };
        world.refresh_projection();
        world.refresh_camera();
        world
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    /// Mark the world as living inside a parent surface of the given logical size.
    pub fn attach(&mut self, parent: SizeConfig) {
        self.attached = true;
        self.client_size = parent;
        self.refresh_projection();
    }

    pub fn detach(&mut self) {
        if self.attached {
            self.auto_resize = false;
            self.attached = false;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn auto_resize(&self) -> bool {
        self.auto_resize
    }

    /// Follow parent size changes. Only valid once attached.
    pub fn set_auto_resize(&mut self, active: bool) -> Result<(), RenderError> {
        if !self.attached {
            return Err(RenderError::NotAttached);
        }
        self.auto_resize = active;
        Ok(())
    }

    /// Called with the new logical width and height after every handled resize.
    pub fn on_resize(&mut self, callback: impl FnMut(f32, f32) + 'static) {
        self.on_resize = Some(Box::new(callback));
    }

    /// Handle a parent size change. Returns whether it was applied.
    ///
    /// Ignored unless auto-resize is on; dropped while another resize is in
    /// progress.
    pub fn notify_resize(&mut self, entry: ResizeEntry) -> Result<bool, RenderError> {
        if !self.auto_resize {
            return Ok(false);
        }
        if self.resizing {
            tracing::debug!("resize dropped: previous resize still in progress");
            return Ok(false);
        }
        self.resizing = true;
        let result = self.apply_resize(entry);
        self.resizing = false;
        result.map(|()| true)
    }

    fn apply_resize(&mut self, entry: ResizeEntry) -> Result<(), RenderError> {
        let (width, height) = entry.device_pixels();
        self.client_size = entry.logical_size;
        if let Some(callback) = self.on_resize.as_mut() {
            callback(entry.logical_size.width, entry.logical_size.height);
        }
        self.gpu.resize_targets(width.max(1), height.max(1))?;
        self.refresh_projection();
        tracing::debug!(
            width,
            height,
            logical_width = entry.logical_size.width,
            logical_height = entry.logical_size.height,
            "world resized"
        );
        Ok(())
    }

    pub fn client_size(&self) -> SizeConfig {
        self.client_size
    }

    pub fn screen_config(&self) -> &ScreenConfig {
        &self.screen
    }

    /// Edit camera or projection; call the matching refresh afterwards.
    pub fn screen_config_mut(&mut self) -> &mut ScreenConfig {
        &mut self.screen
    }

    pub fn matrices(&self) -> &WorldMatrices {
        &self.matrices
    }

    pub fn refresh_camera(&mut self) {
        self.matrices.camera.set(self.screen.camera.view_matrix());
    }

    pub fn refresh_projection(&mut self) {
        let aspect = self.client_size.aspect();
        self.matrices.projection.set(self.screen.projection.matrix(aspect));
    }

    pub fn refresh_transform(&mut self) {
        self.matrices.refresh_transform();
    }

    /// Pointer position in logical pixels from the top-left corner.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = (x, y);
    }

    pub fn pointer(&self) -> (f32, f32) {
        self.pointer
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn next_id(&self) -> u32 {
        self.ids.next_id()
    }

    /// Initialize and register a batch. Replaces any batch with the same id.
    pub fn add_batch<B: RenderBatch>(&mut self, mut batch: B) -> Result<(), RenderError> {
        batch.init(&mut self.gpu, self.ids.clone())?;
        let id = batch.id();
        if self.batches.insert(id, Box::new(batch)).is_some() {
            tracing::debug!(batch = id, "batch replaced");
        } else {
            tracing::debug!(batch = id, "batch registered");
        }
        Ok(())
    }

    /// Remove one batch, or all of them with `None`.
    pub fn remove_batch(&mut self, id: Option<BatchId>) {
        match id {
            Some(id) => {
                self.batches.remove(&id);
            }
            None => self.batches.clear(),
        }
        self.last_rendered = None;
    }

    pub fn batch<B: RenderBatch>(&self, id: BatchId) -> Option<&B> {
        self.batches.get(&id)?.as_any().downcast_ref::<B>()
    }

    pub fn batch_mut<B: RenderBatch>(&mut self, id: BatchId) -> Option<&mut B> {
        self.batches.get_mut(&id)?.as_any_mut().downcast_mut::<B>()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Clear every batch and restart id numbering.
    pub fn clear(&mut self) {
        self.ids.reset();
        for batch in self.batches.values_mut() {
            batch.clear();
        }
    }

    /// Render one frame: picking pass, readback under the pointer, visible pass.
    ///
    /// Returns the picked batch and key, if any.
    pub fn render(&mut self) -> Result<Option<(BatchId, InstanceKey)>, RenderError> {
        if self.disabled {
            return Ok(None);
        }
        if self.gpu.framebuffer_status() == FramebufferStatus::IncompleteAttachment {
            tracing::debug!("frame skipped: picking target incomplete");
            return Ok(None);
        }
        let _span = tracing::trace_span!("world_render").entered();

        self.gpu.begin_pass(&PassDesc {
            target: PassTarget::Picking,
            clear_color: [0.0; 4],
        })?;
        if self.matrices.needs_transform() {
            self.matrices.refresh_transform();
        }
        self.draw_batches(true)?;
        self.gpu.end_pass()?;

        let picked = self.pick()?;

        self.gpu.begin_pass(&PassDesc {
            target: PassTarget::Screen,
            clear_color: self.clear_color,
        })?;
        self.draw_batches(false)?;
        self.gpu.end_pass()?;

        self.matrices.clear_dirty();
        Ok(picked)
    }

    fn draw_batches(&mut self, picking: bool) -> Result<(), RenderError> {
        for batch in self.batches.values_mut() {
            let rendered =
                batch.render(&mut self.gpu, &self.matrices, self.last_rendered, picking)?;
            self.last_rendered = Some(rendered);
        }
        Ok(())
    }

    /// Device texel under the pointer, bottom-left origin.
    fn pointer_texel(&self) -> Option<(u32, u32)> {
        let (x, y) = self.pointer;
        let (width, height) = self.gpu.target_size();
        let client = self.client_size;
        if x < 0.0 || y < 0.0 || client.width <= 0.0 || client.height <= 0.0 {
            return None;
        }
        let px = (x * width as f32 / client.width).floor();
        let py = (height as f32 - y * height as f32 / client.height - 1.0).floor();
        if px >= width as f32 || py < 0.0 || py >= height as f32 {
            return None;
        }
        Some((px as u32, py as u32))
    }

    fn pick(&mut self) -> Result<Option<(BatchId, InstanceKey)>, RenderError> {
        let Some((x, y)) = self.pointer_texel() else {
            return Ok(None);
        };
        let id = decode_pick_bytes(self.gpu.read_pixel(x, y)?);
        if id == 0 {
            return Ok(None);
        }
        let mut picked = None;
        for batch in self.batches.values_mut() {
            if let Some(key) = batch.key_for_id(id) {
                batch.picked(key);
                tracing::debug!(batch = batch.id(), %key, id, "instance picked");
                picked = Some((batch.id(), key));
            }
        }
        Ok(picked)
    }
}
