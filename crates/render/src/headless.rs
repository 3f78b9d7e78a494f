use crate::RenderError;
use crate::backend::{
    BufferDesc, BufferHandle, FramebufferStatus, GpuBackend, PassDesc, PassTarget, ProgramDesc,
    ProgramHandle, UniformValue, VertexArrayDesc, VertexArrayHandle,
};
use std::collections::HashMap;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer { buffer: BufferHandle, label: &'static str, len: usize },
    RespecifyBuffer { buffer: BufferHandle, len: usize },
    UpdateBuffer { buffer: BufferHandle, offset: u64, len: usize },
    CreateProgram(ProgramHandle),
    CreateVertexArray(VertexArrayHandle),
    UseProgram(ProgramHandle),
    SetUniform { program: ProgramHandle, name: String, value: UniformValue },
    BindVertexArray(Option<VertexArrayHandle>),
    Draw { program: Option<ProgramHandle>, index_count: u32, instance_count: u32 },
    ResizeTargets { width: u32, height: u32 },
    BeginPass(PassTarget),
    EndPass,
    ReadPixel { x: u32, y: u32 },
}

struct HeadlessProgram {
    uniforms: HashMap<&'static str, Option<UniformValue>>,
}

/// A [`GpuBackend`] that draws nothing and records everything.
///
/// Buffer contents are kept so tests can inspect what would reach the GPU.
/// The picking pixel, framebuffer status and shader compile result are scripted.
pub struct HeadlessBackend {
    calls: Vec<GpuCall>,
    buffers: Vec<Vec<u8>>,
    programs: Vec<HeadlessProgram>,
    vertex_arrays: Vec<VertexArrayDesc>,
    current_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    size: (u32, u32),
    status: FramebufferStatus,
    pick_pixel: [u8; 4],
    compile_error: Option<String>,
    in_pass: Option<PassTarget>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            calls: Vec::new(),
            buffers: Vec::new(),
            programs: Vec::new(),
            vertex_arrays: Vec::new(),
            current_program: None,
            bound_vertex_array: None,
            size: (width, height),
            status: FramebufferStatus::Complete,
            pick_pixel: [0; 4],
            compile_error: None,
            in_pass: None,
        }
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Recorded draws as `(index_count, instance_count)`.
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::Draw {
                    index_count,
                    instance_count,
                    ..
                } => Some((*index_count, *instance_count)),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer.0 as usize).map(Vec::as_slice)
    }

    pub fn buffer_floats(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        let bytes = self.buffer_bytes(buffer)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// Last value written to a uniform of `program`.
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.programs.get(program.0 as usize)?.uniforms.get(name).copied().flatten()
    }

    /// Pixel returned by every subsequent readback.
    pub fn set_pick_pixel(&mut self, pixel: [u8; 4]) {
        self.pick_pixel = pixel;
    }

    pub fn set_framebuffer_status(&mut self, status: FramebufferStatus) {
        self.status = status;
    }

    /// Make the next `create_program` fail with this compiler log.
    pub fn fail_next_compile(&mut self, log: impl Into<String>) {
        self.compile_error = Some(log.into());
    }

    fn check_buffer(&self, buffer: BufferHandle) -> Result<(), RenderError> {
        if (buffer.0 as usize) < self.buffers.len() {
            Ok(())
        } else {
            Err(RenderError::UnknownHandle)
        }
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError> {
        let buffer = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(contents.to_vec());
        self.calls.push(GpuCall::CreateBuffer {
            buffer,
            label: desc.label,
            len: contents.len(),
        });
        Ok(buffer)
    }

    fn respecify_buffer(
        &mut self,
        buffer: BufferHandle,
        contents: &[u8],
    ) -> Result<(), RenderError> {
        self.check_buffer(buffer)?;
        self.buffers[buffer.0 as usize] = contents.to_vec();
        self.calls.push(GpuCall::RespecifyBuffer {
            buffer,
            len: contents.len(),
        });
        Ok(())
    }

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        contents: &[u8],
    ) -> Result<(), RenderError> {
        self.check_buffer(buffer)?;
        let storage = &mut self.buffers[buffer.0 as usize];
        let start = offset as usize;
        let end = start + contents.len();
        if end > storage.len() {
            return Err(RenderError::BufferCreation(format!(
                "update of {end} bytes overflows a {} byte buffer",
                storage.len()
            )));
        }
        storage[start..end].copy_from_slice(contents);
        self.calls.push(GpuCall::UpdateBuffer {
            buffer,
            offset,
            len: contents.len(),
        });
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, RenderError> {
        if let Some(log) = self.compile_error.take() {
            return Err(RenderError::ShaderCompile {
                label: desc.label.to_string(),
                log,
            });
        }
        let program = ProgramHandle(self.programs.len() as u32);
        self.programs.push(HeadlessProgram {
            uniforms: desc.uniforms.iter().map(|u| (u.name, None)).collect(),
        });
        self.calls.push(GpuCall::CreateProgram(program));
        Ok(program)
    }

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        desc: &VertexArrayDesc,
    ) -> Result<VertexArrayHandle, RenderError> {
        if program.0 as usize >= self.programs.len() {
            return Err(RenderError::UnknownHandle);
        }
        for buffer in desc.vertex_buffers.iter().chain([&desc.index_buffer]) {
            self.check_buffer(*buffer)?;
        }
        let vertex_array = VertexArrayHandle(self.vertex_arrays.len() as u32);
        self.vertex_arrays.push(desc.clone());
        self.calls.push(GpuCall::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), RenderError> {
        if program.0 as usize >= self.programs.len() {
            return Err(RenderError::UnknownHandle);
        }
        self.current_program = Some(program);
        self.calls.push(GpuCall::UseProgram(program));
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: UniformValue,
    ) -> Result<(), RenderError> {
        let entry = self
            .programs
            .get_mut(program.0 as usize)
            .ok_or(RenderError::UnknownHandle)?
            .uniforms
            .get_mut(name)
            .ok_or_else(|| RenderError::UnknownUniform(name.to_string()))?;
        *entry = Some(value);
        self.calls.push(GpuCall::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn bind_vertex_array(
        &mut self,
        vertex_array: Option<VertexArrayHandle>,
    ) -> Result<(), RenderError> {
        if vertex_array.is_some_and(|vao| vao.0 as usize >= self.vertex_arrays.len()) {
            return Err(RenderError::UnknownHandle);
        }
        self.bound_vertex_array = vertex_array;
        self.calls.push(GpuCall::BindVertexArray(vertex_array));
        Ok(())
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
    ) -> Result<(), RenderError> {
        if self.bound_vertex_array.is_none() {
            return Err(RenderError::UnknownHandle);
        }
        self.calls.push(GpuCall::Draw {
            program: self.current_program,
            index_count,
            instance_count,
        });
        Ok(())
    }

    fn resize_targets(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.size = (width, height);
        self.calls.push(GpuCall::ResizeTargets { width, height });
        Ok(())
    }

    fn target_size(&self) -> (u32, u32) {
        self.size
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        self.status
    }

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<(), RenderError> {
        self.in_pass = Some(desc.target);
        self.calls.push(GpuCall::BeginPass(desc.target));
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        self.in_pass = None;
        self.calls.push(GpuCall::EndPass);
        Ok(())
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Result<[u8; 4], RenderError> {
        if x >= self.size.0 || y >= self.size.1 {
            return Err(RenderError::Readback(format!(
                "texel ({x}, {y}) outside {}x{} target",
                self.size.0, self.size.1
            )));
        }
        self.calls.push(GpuCall::ReadPixel { x, y });
        Ok(self.pick_pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferTarget, BufferUsage, UniformDesc, UniformKind};

    fn vertex_desc() -> BufferDesc {
        BufferDesc {
            label: "test",
            target: BufferTarget::Vertex,
            usage: BufferUsage::Dynamic,
        }
    }

    fn program_desc() -> ProgramDesc {
        ProgramDesc {
            label: "test",
            source: "",
            vertex_entry: "vs",
            fragment_entry: "fs",
            buffers: Vec::new(),
            uniforms: vec![UniformDesc {
                name: "flag",
                kind: UniformKind::Bool,
            }],
            cull_back_faces: true,
            depth_test: true,
        }
    }

    #[test]
    fn buffers_keep_their_contents() {
        let mut gpu = HeadlessBackend::new(4, 4);
        let b = gpu.create_buffer(&vertex_desc(), bytemuck::cast_slice(&[1.0f32, 2.0])).unwrap();
        gpu.update_buffer(b, 4, bytemuck::cast_slice(&[5.0f32])).unwrap();
        assert_eq!(gpu.buffer_floats(b).unwrap(), vec![1.0, 5.0]);
        gpu.respecify_buffer(b, bytemuck::cast_slice(&[7.0f32; 3])).unwrap();
        assert_eq!(gpu.buffer_floats(b).unwrap().len(), 3);
    }

    #[test]
    fn overflowing_update_is_an_error() {
        let mut gpu = HeadlessBackend::new(4, 4);
        let b = gpu.create_buffer(&vertex_desc(), &[0; 4]).unwrap();
        assert!(gpu.update_buffer(b, 2, &[0; 4]).is_err());
    }

    #[test]
    fn scripted_compile_failure() {
        let mut gpu = HeadlessBackend::new(4, 4);
        gpu.fail_next_compile("expected ';'");
        let err = gpu.create_program(&program_desc()).unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { ref log, .. } if log == "expected ';'"));
        assert!(gpu.create_program(&program_desc()).is_ok());
    }

    #[test]
    fn unknown_uniform_is_reported() {
        let mut gpu = HeadlessBackend::new(4, 4);
        let p = gpu.create_program(&program_desc()).unwrap();
        gpu.set_uniform(p, "flag", UniformValue::Bool(true)).unwrap();
        assert_eq!(gpu.uniform(p, "flag"), Some(UniformValue::Bool(true)));
        assert!(matches!(
            gpu.set_uniform(p, "missing", UniformValue::Bool(true)),
            Err(RenderError::UnknownUniform(_))
        ));
    }

    #[test]
    fn readback_outside_target_fails() {
        let mut gpu = HeadlessBackend::new(4, 4);
        gpu.set_pick_pixel([1, 0, 0, 0]);
        assert_eq!(gpu.read_pixel(3, 3).unwrap(), [1, 0, 0, 0]);
        assert!(gpu.read_pixel(4, 0).is_err());
    }
}
