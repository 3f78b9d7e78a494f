use crate::RenderError;
use crate::backend::{
    BufferDesc, BufferHandle, BufferTarget, BufferUsage, GpuBackend, ProgramDesc, ProgramHandle,
    StepMode, UniformDesc, UniformKind, UniformValue, VertexArrayDesc, VertexArrayHandle,
    VertexAttributeDesc, VertexBufferLayout, VertexFormat,
};
use crate::batch::{BatchId, RenderBatch};
use crate::matrices::WorldMatrices;
use crate::picking::{decode_pick_floats, encode_pick_id};
use crate::shaders::CUBE_SHADER;
use cubetext_common::{Color, Coordinate, IdGenerator, InstanceKey};
use cubetext_instancing::{
    Attribute, AttributeDesc, AttributeId, AttributeSink, AttributeUsage, InstanceBuffers,
    UploadKind,
};
use glam::{Mat4, Quat, Vec3};
use std::any::Any;
use std::collections::HashMap;

const SURFACE: AttributeId = AttributeId(0);
const ID: AttributeId = AttributeId(1);
const COLOR: AttributeId = AttributeId(2);
const POSITION: AttributeId = AttributeId(3);
const ROTATION: AttributeId = AttributeId(4);
const SIZE: AttributeId = AttributeId(5);

//   4----5
//  /|   /|
// 0----3 |
// | 6  | 7
// 1----2
#[rustfmt::skip]
const CUBE_POINTS: [f32; 24] = [
    -0.5,  0.5,  0.5,
    -0.5, -0.5,  0.5,
     0.5, -0.5,  0.5,
     0.5,  0.5,  0.5,
    -0.5,  0.5, -0.5,
     0.5,  0.5, -0.5,
    -0.5, -0.5, -0.5,
     0.5, -0.5, -0.5,
];

#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    0, 1, 2,  0, 2, 3, // front
    4, 0, 3,  4, 3, 5, // top
    4, 6, 1,  4, 1, 0, // left
    3, 2, 7,  3, 7, 5, // right
    5, 7, 6,  5, 6, 4, // back
    1, 6, 7,  1, 7, 2, // bottom
];

#[derive(Debug, Clone)]
pub struct CubeBatchConfig {
    /// Instances reserved up front per attribute; grows by doubling.
    pub initial_capacity: usize,
}

impl Default for CubeBatchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 4096,
        }
    }
}

/// Initial per-instance values of one cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeAttributes {
    pub color: Color,
    pub position: Coordinate,
    pub rotation: Mat4,
    pub size: f32,
}

impl Default for CubeAttributes {
    fn default() -> Self {
        Self {
            color: [1.0; 4],
            position: [0.0; 3],
            rotation: Mat4::IDENTITY,
            size: 1.0,
        }
    }
}

/// Partial update for [`CubeBatch::modify`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CubePatch {
    pub color: Option<Color>,
    pub position: Option<Coordinate>,
    pub rotation: Option<Mat4>,
    pub size: Option<f32>,
}

struct GpuState {
    program: ProgramHandle,
    vertex_array: VertexArrayHandle,
    buffers: Vec<BufferHandle>,
    ids: IdGenerator,
}

/// Forwards attribute uploads to the buffers created for them at init.
struct GpuSink<'a> {
    gpu: &'a mut dyn GpuBackend,
    buffers: &'a [BufferHandle],
}

impl AttributeSink for GpuSink<'_> {
    type Error = RenderError;

    fn upload(
        &mut self,
        id: AttributeId,
        attribute: &Attribute,
        kind: UploadKind,
    ) -> Result<(), RenderError> {
        let buffer = *self.buffers.get(id.0).ok_or(RenderError::UnknownHandle)?;
        let bytes: &[u8] = bytemuck::cast_slice(attribute.data());
        match kind {
            UploadKind::Respecify => self.gpu.respecify_buffer(buffer, bytes),
            UploadKind::Update => self.gpu.update_buffer(buffer, 0, bytes),
        }
    }
}

/// One shared unit cube drawn once per instance.
pub struct CubeBatch {
    buffers: InstanceBuffers<InstanceKey>,
    key_by_id: HashMap<u32, InstanceKey>,
    gpu: Option<GpuState>,
    force_upload: bool,
    on_select: Option<Box<dyn FnMut(InstanceKey)>>,
}

impl Default for CubeBatch {
    fn default() -> Self {
        Self::new(CubeBatchConfig::default())
    }
}

impl CubeBatch {
    pub const ID: BatchId = "cube";

    pub fn new(config: CubeBatchConfig) -> Self {
        let capacity = config.initial_capacity;
        let buffers = InstanceBuffers::new([
            AttributeDesc::fixed("a_surface", 3, CUBE_POINTS.to_vec()),
            AttributeDesc::instanced("a_id", 4, capacity),
            AttributeDesc::instanced("a_color", 4, capacity).dynamic(),
            AttributeDesc::instanced("a_position", 3, capacity).dynamic(),
            AttributeDesc::instanced("a_rotation", 4, capacity).dynamic().matrix(),
            AttributeDesc::instanced("a_size", 1, capacity).dynamic(),
        ]);
        Self {
            buffers,
            key_by_id: HashMap::new(),
            gpu: None,
            force_upload: false,
            on_select: None,
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.buffers.contains(&key)
    }

    /// Number of live picking ids.
    pub fn id_count(&self) -> usize {
        self.key_by_id.len()
    }

    /// Called with the key of every cube picked under the pointer.
    pub fn on_select(&mut self, callback: impl FnMut(InstanceKey) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn add(&mut self, key: InstanceKey, attrs: CubeAttributes) -> Result<(), RenderError> {
        let state = self.gpu.as_ref().ok_or(RenderError::NotInitialized(Self::ID))?;
        let id = state.ids.next_id();
        let encoded = encode_pick_id(id);
        let rotation = attrs.rotation.to_cols_array();
        self.buffers.allocate(
            key,
            &[
                (ID, &encoded),
                (COLOR, &attrs.color),
                (POSITION, &attrs.position),
                (ROTATION, &rotation),
                (SIZE, &[attrs.size]),
            ],
        )?;
        self.key_by_id.insert(id, key);
        Ok(())
    }

    /// Overwrite some attributes of a live cube. False if `key` is not live.
    pub fn modify(&mut self, key: InstanceKey, patch: CubePatch) -> bool {
        if !self.buffers.contains(&key) {
            return false;
        }
        let mut cubes = self.instances();
        if let Some(color) = patch.color {
            cubes.set_color(key, color);
        }
        if let Some(position) = patch.position {
            cubes.set_position(key, Vec3::from_array(position));
        }
        if let Some(rotation) = patch.rotation {
            cubes.set_rotation_matrix(key, rotation);
        }
        if let Some(size) = patch.size {
            cubes.set_size(key, size);
        }
        true
    }

    /// Remove a cube and its picking id. False if `key` is not live.
    pub fn delete(&mut self, key: InstanceKey) -> bool {
        // The id has to be read while the slot still exists.
        let Some(id) = self.buffers.view(&key, ID).map(decode_pick_floats) else {
            return false;
        };
        self.key_by_id.remove(&id);
        self.buffers.release(&key)
    }

    /// Visit one named attribute of a cube; a `true` return marks it for upload.
    pub fn cube_attr<F>(&mut self, key: InstanceKey, name: &str, visitor: F) -> bool
    where
        F: FnOnce(&mut [f32]) -> bool,
    {
        match self.buffers.attribute_id(name) {
            Some(id) => self.buffers.read(&key, id, visitor),
            None => false,
        }
    }

    /// Restricted handle over the live cubes, for per-frame animation.
    pub fn instances(&mut self) -> CubeInstances<'_> {
        CubeInstances {
            buffers: &mut self.buffers,
        }
    }

    /// Upload every attribute at the next render, dirty or not.
    pub fn request_full_upload(&mut self) {
        self.force_upload = true;
    }

    fn vertex_layouts(&self) -> Result<Vec<VertexBufferLayout>, RenderError> {
        let mut location = 0;
        let mut layouts = Vec::new();
        for (_, attr) in self.buffers.attributes() {
            let format = match attr.size() {
                1 => VertexFormat::Float32,
                3 => VertexFormat::Float32x3,
                4 => VertexFormat::Float32x4,
                other => {
                    return Err(RenderError::MissingCapability(format!(
                        "{}-component attribute '{}'",
                        other,
                        attr.name()
                    )));
                }
            };
            let columns = if attr.is_matrix() { attr.size() } else { 1 };
            let attributes = (0..columns)
                .map(|column| {
                    let desc = VertexAttributeDesc {
                        location,
                        format,
                        offset: column as u64 * format.byte_size(),
                    };
                    location += 1;
                    desc
                })
                .collect();
            layouts.push(VertexBufferLayout {
                stride: attr.stride() as u64 * 4,
                step: if attr.is_fixed() {
                    StepMode::Vertex
                } else {
                    StepMode::Instance
                },
                attributes,
            });
        }
        Ok(layouts)
    }
}

impl RenderBatch for CubeBatch {
    fn id(&self) -> BatchId {
        Self::ID
    }

    fn init(&mut self, gpu: &mut dyn GpuBackend, ids: IdGenerator) -> Result<(), RenderError> {
        let program = gpu.create_program(&ProgramDesc {
            label: "cube",
            source: CUBE_SHADER,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            buffers: self.vertex_layouts()?,
            uniforms: vec![
                UniformDesc {
                    name: "transform",
                    kind: UniformKind::Mat4,
                },
                UniformDesc {
                    name: "is_picking",
                    kind: UniformKind::Bool,
                },
            ],
            cull_back_faces: true,
            depth_test: true,
        })?;

        let mut buffers = Vec::new();
        for (_, attr) in self.buffers.attributes() {
            let desc = BufferDesc {
                label: attr.name(),
                target: BufferTarget::Vertex,
                usage: match attr.usage() {
                    AttributeUsage::Static => BufferUsage::Static,
                    AttributeUsage::Dynamic => BufferUsage::Dynamic,
                },
            };
            buffers.push(gpu.create_buffer(&desc, bytemuck::cast_slice(attr.data()))?);
        }
        let index_buffer = gpu.create_buffer(
            &BufferDesc {
                label: "cube_indices",
                target: BufferTarget::Index,
                usage: BufferUsage::Static,
            },
            bytemuck::cast_slice(&CUBE_INDICES),
        )?;
        let vertex_array = gpu.create_vertex_array(
            program,
            &VertexArrayDesc {
                vertex_buffers: buffers.clone(),
                index_buffer,
            },
        )?;

        // Buffers were created from the current mirrors, so anything added
        // before now is already on the GPU.
        self.buffers.mark_clean();

        tracing::debug!(batch = Self::ID, instances = self.buffers.len(), "batch initialized");
        self.gpu = Some(GpuState {
            program,
            vertex_array,
            buffers,
            ids,
        });
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    fn render(
        &mut self,
        gpu: &mut dyn GpuBackend,
        matrices: &WorldMatrices,
        last: Option<BatchId>,
        picking: bool,
    ) -> Result<BatchId, RenderError> {
        let state = self.gpu.as_ref().ok_or(RenderError::NotInitialized(Self::ID))?;
        if last != Some(Self::ID) {
            gpu.use_program(state.program)?;
        }
        gpu.set_uniform(state.program, "is_picking", UniformValue::Bool(picking))?;
        gpu.bind_vertex_array(Some(state.vertex_array))?;

        let force = std::mem::take(&mut self.force_upload);
        let mut sink = GpuSink {
            gpu: &mut *gpu,
            buffers: &state.buffers,
        };
        self.buffers.flush(&mut sink, force)?;

        if matrices.transformation.dirty {
            gpu.set_uniform(
                state.program,
                "transform",
                UniformValue::Mat4(matrices.transformation.mat),
            )?;
        }
        let count = self.buffers.len() as u32;
        if count > 0 {
            gpu.draw_indexed_instanced(CUBE_INDICES.len() as u32, count)?;
        }
        gpu.bind_vertex_array(None)?;
        Ok(Self::ID)
    }

    fn key_for_id(&self, id: u32) -> Option<InstanceKey> {
        self.key_by_id.get(&id).copied()
    }

    fn picked(&mut self, key: InstanceKey) {
        if let Some(callback) = self.on_select.as_mut() {
            callback(key);
        }
    }

    fn clear(&mut self) {
        self.buffers.clear();
        self.key_by_id.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Live per-cube attributes, without the ability to add or remove cubes.
pub struct CubeInstances<'a> {
    buffers: &'a mut InstanceBuffers<InstanceKey>,
}

impl CubeInstances<'_> {
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.buffers.contains(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.buffers.keys().copied()
    }

    pub fn position(&self, key: InstanceKey) -> Option<Vec3> {
        self.buffers.view(&key, POSITION).map(Vec3::from_slice)
    }

    pub fn set_position(&mut self, key: InstanceKey, position: Vec3) -> bool {
        self.overwrite(key, POSITION, &position.to_array())
    }

    pub fn rotation(&self, key: InstanceKey) -> Option<Mat4> {
        self.buffers.view(&key, ROTATION).map(Mat4::from_cols_slice)
    }

    pub fn set_rotation(&mut self, key: InstanceKey, rotation: Quat) -> bool {
        self.set_rotation_matrix(key, Mat4::from_quat(rotation))
    }

    pub fn set_rotation_matrix(&mut self, key: InstanceKey, rotation: Mat4) -> bool {
        self.overwrite(key, ROTATION, &rotation.to_cols_array())
    }

    pub fn color(&self, key: InstanceKey) -> Option<Color> {
        let v = self.buffers.view(&key, COLOR)?;
        Some([v[0], v[1], v[2], v[3]])
    }

    pub fn set_color(&mut self, key: InstanceKey, color: Color) -> bool {
        self.overwrite(key, COLOR, &color)
    }

    pub fn size(&self, key: InstanceKey) -> Option<f32> {
        self.buffers.view(&key, SIZE).map(|v| v[0])
    }

    pub fn set_size(&mut self, key: InstanceKey, size: f32) -> bool {
        self.overwrite(key, SIZE, &[size])
    }

    fn overwrite(&mut self, key: InstanceKey, id: AttributeId, values: &[f32]) -> bool {
        self.buffers.read(&key, id, |slot| {
            slot.copy_from_slice(values);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GpuCall, HeadlessBackend};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ready(capacity: usize) -> (CubeBatch, HeadlessBackend) {
        let mut gpu = HeadlessBackend::new(8, 8);
        let mut batch = CubeBatch::new(CubeBatchConfig {
            initial_capacity: capacity,
        });
        batch.init(&mut gpu, IdGenerator::new()).unwrap();
        (batch, gpu)
    }

    fn cube_at(x: f32) -> CubeAttributes {
        CubeAttributes {
            position: [x, 0.0, 0.0],
            ..CubeAttributes::default()
        }
    }

    #[test]
    fn init_creates_one_buffer_per_attribute() {
        let (batch, gpu) = ready(4);
        let created = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::CreateBuffer { .. }))
            .count();
        assert_eq!(created, 7);
        assert!(batch.is_initialized());
        assert_eq!(gpu.buffer_floats(BufferHandle(0)).unwrap(), CUBE_POINTS.to_vec());
    }

    #[test]
    fn first_render_after_init_uploads_nothing() {
        let (mut batch, mut gpu) = ready(4);
        gpu.clear_calls();
        batch.render(&mut gpu, &WorldMatrices::default(), None, false).unwrap();
        let buffer_writes = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::UpdateBuffer { .. } | GpuCall::RespecifyBuffer { .. }))
            .count();
        assert_eq!(buffer_writes, 0);
    }

    #[test]
    fn vertex_layout_spans_nine_locations() {
        let batch = CubeBatch::default();
        let layouts = batch.vertex_layouts().unwrap();
        assert_eq!(layouts.len(), 6);
        assert_eq!(layouts[0].step, StepMode::Vertex);
        assert_eq!(layouts[4].stride, 64);
        assert_eq!(layouts[4].attributes.len(), 4);
        assert_eq!(layouts[5].attributes[0].location, 8);
    }

    #[test]
    fn add_before_init_fails() {
        let mut batch = CubeBatch::default();
        let err = batch.add(InstanceKey(1), CubeAttributes::default()).unwrap_err();
        assert!(matches!(err, RenderError::NotInitialized("cube")));
    }

    #[test]
    fn add_encodes_picking_ids() {
        let (mut batch, _gpu) = ready(4);
        batch.add(InstanceKey(10), cube_at(0.0)).unwrap();
        batch.add(InstanceKey(11), cube_at(1.0)).unwrap();
        assert_eq!(batch.key_for_id(1), Some(InstanceKey(10)));
        assert_eq!(batch.key_for_id(2), Some(InstanceKey(11)));
        assert_eq!(batch.buffers.view(&InstanceKey(11), ID).unwrap(), &encode_pick_id(2));
    }

    #[test]
    fn delete_drops_the_reverse_mapping() {
        let (mut batch, _gpu) = ready(4);
        for i in 0..3 {
            batch.add(InstanceKey(i), cube_at(i as f32)).unwrap();
        }
        assert!(batch.delete(InstanceKey(0)));
        assert!(!batch.delete(InstanceKey(0)));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.id_count(), 2);
        assert_eq!(batch.key_for_id(1), None);
        assert_eq!(batch.key_for_id(3), Some(InstanceKey(2)));
        assert_eq!(batch.instances().position(InstanceKey(2)), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn render_draws_all_instances_and_uploads() {
        let (mut batch, mut gpu) = ready(4);
        batch.add(InstanceKey(1), cube_at(3.0)).unwrap();
        let matrices = WorldMatrices::default();
        let id = batch.render(&mut gpu, &matrices, None, false).unwrap();
        assert_eq!(id, "cube");
        assert_eq!(gpu.draws(), vec![(36, 1)]);
        let positions = gpu.buffer_floats(BufferHandle(POSITION.0 as u32)).unwrap();
        assert_eq!(&positions[..3], &[3.0, 0.0, 0.0]);
        assert_eq!(gpu.uniform(ProgramHandle(0), "is_picking"), Some(UniformValue::Bool(false)));
    }

    #[test]
    fn same_batch_twice_skips_program_rebind() {
        let (mut batch, mut gpu) = ready(4);
        let matrices = WorldMatrices::default();
        gpu.clear_calls();
        let last = batch.render(&mut gpu, &matrices, None, true).unwrap();
        batch.render(&mut gpu, &matrices, Some(last), false).unwrap();
        let binds = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::UseProgram(_)))
            .count();
        assert_eq!(binds, 1);
        assert!(gpu.draws().is_empty());
    }

    #[test]
    fn transform_uploads_only_when_dirty() {
        let (mut batch, mut gpu) = ready(4);
        let mut matrices = WorldMatrices::default();
        matrices.clear_dirty();
        gpu.clear_calls();
        batch.render(&mut gpu, &matrices, None, false).unwrap();
        let uploads = |gpu: &HeadlessBackend| {
            gpu.calls()
                .iter()
                .filter(|c| matches!(c, GpuCall::SetUniform { name, .. } if name == "transform"))
                .count()
        };
        assert_eq!(uploads(&gpu), 0);
        matrices.refresh_transform();
        batch.render(&mut gpu, &matrices, None, false).unwrap();
        assert_eq!(uploads(&gpu), 1);
    }

    #[test]
    fn growth_respecifies_buffers() {
        let (mut batch, mut gpu) = ready(2);
        for i in 0..3 {
            batch.add(InstanceKey(i), cube_at(0.0)).unwrap();
        }
        gpu.clear_calls();
        batch.render(&mut gpu, &WorldMatrices::default(), None, false).unwrap();
        let respecified = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::RespecifyBuffer { .. }))
            .count();
        assert_eq!(respecified, 5);
        let sizes = gpu.buffer_floats(BufferHandle(SIZE.0 as u32)).unwrap();
        assert_eq!(sizes.len(), 4);
    }

    #[test]
    fn forced_upload_includes_the_fixed_mesh() {
        let (mut batch, mut gpu) = ready(2);
        batch.render(&mut gpu, &WorldMatrices::default(), None, false).unwrap();
        gpu.clear_calls();
        batch.request_full_upload();
        batch.render(&mut gpu, &WorldMatrices::default(), None, false).unwrap();
        let updates = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::UpdateBuffer { .. }))
            .count();
        assert_eq!(updates, 6);
    }

    #[test]
    fn modify_and_instances_write_through() {
        let (mut batch, _gpu) = ready(4);
        batch.add(InstanceKey(5), cube_at(0.0)).unwrap();
        assert!(batch.modify(
            InstanceKey(5),
            CubePatch {
                size: Some(2.5),
                color: Some([0.0, 1.0, 0.0, 1.0]),
                ..CubePatch::default()
            }
        ));
        assert!(!batch.modify(InstanceKey(6), CubePatch::default()));
        let mut cubes = batch.instances();
        assert_eq!(cubes.size(InstanceKey(5)), Some(2.5));
        assert_eq!(cubes.color(InstanceKey(5)), Some([0.0, 1.0, 0.0, 1.0]));
        let q = Quat::from_rotation_z(1.0);
        assert!(cubes.set_rotation(InstanceKey(5), q));
        let back = cubes.rotation(InstanceKey(5)).unwrap();
        assert!(back.abs_diff_eq(Mat4::from_quat(q), 1e-6));
    }

    #[test]
    fn cube_attr_by_name() {
        let (mut batch, _gpu) = ready(4);
        batch.add(InstanceKey(1), cube_at(7.0)).unwrap();
        let mut seen = Vec::new();
        assert!(batch.cube_attr(InstanceKey(1), "a_position", |v| {
            seen.extend_from_slice(v);
            false
        }));
        assert_eq!(seen, vec![7.0, 0.0, 0.0]);
        assert!(!batch.cube_attr(InstanceKey(1), "a_missing", |_| true));
    }

    #[test]
    fn picked_notifies_on_select() {
        let (mut batch, _gpu) = ready(4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        batch.on_select(move |key| sink.borrow_mut().push(key));
        batch.picked(InstanceKey(3));
        assert_eq!(*seen.borrow(), vec![InstanceKey(3)]);
    }

    #[test]
    fn clear_empties_instances_and_ids() {
        let (mut batch, _gpu) = ready(4);
        for i in 0..3 {
            batch.add(InstanceKey(i), cube_at(0.0)).unwrap();
        }
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.id_count(), 0);
    }
}
