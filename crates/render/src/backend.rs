use crate::RenderError;
use glam::Mat4;

/// Opaque GPU buffer handle. Stays valid across re-specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Binding of vertex buffers and an index buffer to one program's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub label: &'static str,
    pub target: BufferTarget,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn byte_size(self) -> u64 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferLayout {
    pub stride: u64,
    pub step: StepMode,
    pub attributes: Vec<VertexAttributeDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformDesc {
    pub name: &'static str,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Bool(bool),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Bool(_) => UniformKind::Bool,
        }
    }
}

/// Everything a backend needs to build one shader program.
///
/// Uniforms are packed in declaration order into a single block at group 0,
/// binding 0, using std140-style alignment.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: &'static str,
    /// WGSL source holding both entry points.
    pub source: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub buffers: Vec<VertexBufferLayout>,
    pub uniforms: Vec<UniformDesc>,
    pub cull_back_faces: bool,
    pub depth_test: bool,
}

#[derive(Debug, Clone)]
pub struct VertexArrayDesc {
    /// One buffer per layout slot of the program, in slot order.
    pub vertex_buffers: Vec<BufferHandle>,
    pub index_buffer: BufferHandle,
}

/// Where a pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// Offscreen RGBA8 target with depth, blending disabled.
    Picking,
    /// The visible surface, alpha blending enabled.
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDesc {
    pub target: PassTarget,
    pub clear_color: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramebufferStatus {
    #[default]
    Complete,
    IncompleteAttachment,
}

/// The GPU operations the scene context and its batches rely on.
///
/// State is sticky the way a GL context is: the program bound by
/// [`GpuBackend::use_program`] and the vertex array bound by
/// [`GpuBackend::bind_vertex_array`] remain current across passes until
/// replaced.
pub trait GpuBackend {
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError>;

    /// Replace a buffer's storage (new size) keeping its handle.
    fn respecify_buffer(
        &mut self,
        buffer: BufferHandle,
        contents: &[u8],
    ) -> Result<(), RenderError>;

    /// Overwrite a byte range of an existing buffer.
    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        contents: &[u8],
    ) -> Result<(), RenderError>;

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, RenderError>;

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        desc: &VertexArrayDesc,
    ) -> Result<VertexArrayHandle, RenderError>;

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), RenderError>;

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: UniformValue,
    ) -> Result<(), RenderError>;

    fn bind_vertex_array(
        &mut self,
        vertex_array: Option<VertexArrayHandle>,
    ) -> Result<(), RenderError>;

    /// Draw triangles from the bound vertex array with the current program.
    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
    ) -> Result<(), RenderError>;

    /// Resize the picking color and depth targets, in device pixels.
    fn resize_targets(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Current render target size in device pixels.
    fn target_size(&self) -> (u32, u32);

    fn framebuffer_status(&self) -> FramebufferStatus;

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<(), RenderError>;

    fn end_pass(&mut self) -> Result<(), RenderError>;

    /// Read one RGBA8 texel of the picking target. `y` counts from the bottom row.
    fn read_pixel(&mut self, x: u32, y: u32) -> Result<[u8; 4], RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_kind_matches_value() {
        assert_eq!(UniformValue::Bool(true).kind(), UniformKind::Bool);
        assert_eq!(UniformValue::Mat4(Mat4::IDENTITY).kind(), UniformKind::Mat4);
    }

    #[test]
    fn vertex_format_sizes() {
        assert_eq!(VertexFormat::Float32x4.byte_size() * 4, 64);
        assert_eq!(VertexFormat::Float32x3.byte_size(), 12);
    }
}
