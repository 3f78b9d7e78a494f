use crate::targets::{DEPTH_FORMAT, PICKING_FORMAT, RenderTargets, texture_row};
use crate::uniforms::{UniformLayout, encode};
use cubetext_render::{
    BufferDesc, BufferHandle, BufferTarget, FramebufferStatus, GpuBackend, PassDesc, PassTarget,
    ProgramDesc, ProgramHandle, RenderError, StepMode, UniformValue, VertexArrayDesc,
    VertexArrayHandle, VertexFormat,
};
use wgpu::util::DeviceExt;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    label: &'static str,
    usage: wgpu::BufferUsages,
}

struct GpuProgram {
    screen: wgpu::RenderPipeline,
    picking: wgpu::RenderPipeline,
    uniforms: UniformLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct DrawCommand {
    program: ProgramHandle,
    vertex_array: VertexArrayHandle,
    index_count: u32,
    instance_count: u32,
}

struct RecordedPass {
    desc: PassDesc,
    draws: Vec<DrawCommand>,
}

/// [`GpuBackend`] on a wgpu device.
///
/// The visible pass draws into the view set with
/// [`WgpuBackend::set_frame_target`]; without one, visible draws are dropped
/// and only picking runs.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    size: (u32, u32),
    targets: RenderTargets,
    frame_target: Option<wgpu::TextureView>,
    buffers: Vec<GpuBuffer>,
    programs: Vec<GpuProgram>,
    vertex_arrays: Vec<VertexArrayDesc>,
    current_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    pass: Option<RecordedPass>,
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn buffer_usages(target: BufferTarget) -> wgpu::BufferUsages {
    match target {
        BufferTarget::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        BufferTarget::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    }
}

/// wgpu rejects empty vertex buffers; keep at least one word.
fn padded(contents: &[u8]) -> &[u8] {
    const EMPTY: [u8; 4] = [0; 4];
    if contents.is_empty() { &EMPTY } else { contents }
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let targets = RenderTargets::new(&device, width, height);
        Self {
            device,
            queue,
            surface_format,
            size: (width, height),
            targets,
            frame_target: None,
            buffers: Vec::new(),
            programs: Vec::new(),
            vertex_arrays: Vec::new(),
            current_program: None,
            bound_vertex_array: None,
            pass: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// View the next visible pass renders into, usually the swapchain frame.
    pub fn set_frame_target(&mut self, view: Option<wgpu::TextureView>) {
        self.frame_target = view;
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&GpuBuffer, RenderError> {
        self.buffers.get(handle.0 as usize).ok_or(RenderError::UnknownHandle)
    }

    fn program(&self, handle: ProgramHandle) -> Result<&GpuProgram, RenderError> {
        self.programs.get(handle.0 as usize).ok_or(RenderError::UnknownHandle)
    }

    fn build_pipeline(
        &self,
        desc: &ProgramDesc,
        module: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        buffers: &[wgpu::VertexBufferLayout<'_>],
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some(desc.vertex_entry),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(desc.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.cull_back_faces.then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: desc.depth_test,
                depth_compare: if desc.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError> {
        let usage = buffer_usages(desc.target);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: padded(contents),
            usage,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::BufferCreation(format!("{}: {err}", desc.label)));
        }
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(GpuBuffer {
            buffer,
            label: desc.label,
            usage,
        });
        Ok(handle)
    }

    fn respecify_buffer(
        &mut self,
        handle: BufferHandle,
        contents: &[u8],
    ) -> Result<(), RenderError> {
        let (label, usage) = {
            let existing = self.buffer(handle)?;
            (existing.label, existing.usage)
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: padded(contents),
            usage,
        });
        tracing::trace!(buffer = label, bytes = contents.len(), "buffer respecified");
        self.buffers[handle.0 as usize].buffer = buffer;
        Ok(())
    }

    fn update_buffer(
        &mut self,
        handle: BufferHandle,
        offset: u64,
        contents: &[u8],
    ) -> Result<(), RenderError> {
        let target = self.buffer(handle)?;
        if offset + contents.len() as u64 > target.buffer.size() {
            return Err(RenderError::BufferCreation(format!(
                "{}: update past the end of the buffer",
                target.label
            )));
        }
        if !contents.is_empty() {
            self.queue.write_buffer(&target.buffer, offset, contents);
        }
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile {
                label: desc.label.to_string(),
                log: err.to_string(),
            });
        }

        let uniforms = UniformLayout::new(&desc.uniforms);
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: uniforms.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(desc.label),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .buffers
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|a| wgpu::VertexAttribute {
                        format: vertex_format(a.format),
                        offset: a.offset,
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .buffers
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: match layout.step {
                    StepMode::Vertex => wgpu::VertexStepMode::Vertex,
                    StepMode::Instance => wgpu::VertexStepMode::Instance,
                },
                attributes,
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let screen = self.build_pipeline(
            desc,
            &module,
            &pipeline_layout,
            &buffers,
            self.surface_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );
        let picking = self.build_pipeline(
            desc,
            &module,
            &pipeline_layout,
            &buffers,
            PICKING_FORMAT,
            None,
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ProgramLink {
                label: desc.label.to_string(),
                log: err.to_string(),
            });
        }

        let handle = ProgramHandle(self.programs.len() as u32);
        self.programs.push(GpuProgram {
            screen,
            picking,
            uniforms,
            uniform_buffer,
            bind_group,
        });
        tracing::debug!(program = desc.label, "program created");
        Ok(handle)
    }

    fn create_vertex_array(
        &mut self,
        program: ProgramHandle,
        desc: &VertexArrayDesc,
    ) -> Result<VertexArrayHandle, RenderError> {
        self.program(program)?;
        for handle in desc.vertex_buffers.iter().chain([&desc.index_buffer]) {
            self.buffer(*handle)?;
        }
        let handle = VertexArrayHandle(self.vertex_arrays.len() as u32);
        self.vertex_arrays.push(desc.clone());
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), RenderError> {
        self.program(program)?;
        self.current_program = Some(program);
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramHandle,
        name: &str,
        value: UniformValue,
    ) -> Result<(), RenderError> {
        let target = self.program(program)?;
        let slot = target
            .uniforms
            .slot(name)
            .ok_or_else(|| RenderError::UnknownUniform(name.to_string()))?;
        if slot.kind != value.kind() {
            return Err(RenderError::UnknownUniform(format!("{name} ({:?})", value.kind())));
        }
        self.queue.write_buffer(&target.uniform_buffer, slot.offset, &encode(value));
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
        Ok(())
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
    ) -> Result<(), RenderError> {
        let (Some(program), Some(vertex_array)) = (self.current_program, self.bound_vertex_array)
        else {
            return Err(RenderError::UnknownHandle);
        };
        match self.pass.as_mut() {
            Some(pass) => pass.draws.push(DrawCommand {
                program,
                vertex_array,
                index_count,
                instance_count,
            }),
            None => tracing::warn!("draw outside of a pass dropped"),
        }
        Ok(())
    }

    fn resize_targets(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.size = (width, height);
        self.targets = RenderTargets::new(&self.device, width, height);
        Ok(())
    }

    fn target_size(&self) -> (u32, u32) {
        self.size
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        if self.size.0 == 0 || self.size.1 == 0 {
            FramebufferStatus::IncompleteAttachment
        } else {
            FramebufferStatus::Complete
        }
    }

    fn begin_pass(&mut self, desc: &PassDesc) -> Result<(), RenderError> {
        if self.pass.is_some() {
            tracing::warn!("pass begun before the previous one ended");
        }
        self.pass = Some(RecordedPass {
            desc: *desc,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        let Some(recorded) = self.pass.take() else {
            return Ok(());
        };
        let (color, depth) = match recorded.desc.target {
            PassTarget::Picking => (&self.targets.picking_view, &self.targets.picking_depth),
            PassTarget::Screen => match self.frame_target.as_ref() {
                Some(view) => (view, &self.targets.screen_depth),
                None => {
                    tracing::trace!("visible pass skipped: no frame target");
                    return Ok(());
                }
            },
        };
        let [r, g, b, a] = recorded.desc.clear_color;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cube_text_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(match recorded.desc.target {
                    PassTarget::Picking => "picking_pass",
                    PassTarget::Screen => "screen_pass",
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &recorded.draws {
                let program = self.program(draw.program)?;
                let vertex_array = self
                    .vertex_arrays
                    .get(draw.vertex_array.0 as usize)
                    .ok_or(RenderError::UnknownHandle)?;
                pass.set_pipeline(match recorded.desc.target {
                    PassTarget::Picking => &program.picking,
                    PassTarget::Screen => &program.screen,
                });
                pass.set_bind_group(0, &program.bind_group, &[]);
                for (slot, handle) in vertex_array.vertex_buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, self.buffer(*handle)?.buffer.slice(..));
                }
                pass.set_index_buffer(
                    self.buffer(vertex_array.index_buffer)?.buffer.slice(..),
                    wgpu::IndexFormat::Uint16,
                );
                pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Result<[u8; 4], RenderError> {
        let (width, height) = self.size;
        if x >= width || y >= height {
            return Err(RenderError::Readback(format!(
                "texel ({x}, {y}) outside {width}x{height} target"
            )));
        }
        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("picking_readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("picking_readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.targets.picking,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x,
                    y: texture_row(y, height),
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = output.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        let pixel = {
            let view = slice.get_mapped_range();
            [view[0], view[1], view[2], view[3]]
        };
        output.unmap();
        Ok(pixel)
    }
}
