//! Rendering layer: a renderer-agnostic GPU interface, the scene context that
//! owns camera and projection state, and the instanced cube batch.
//!
//! # Invariants
//! - The combined transform is recomputed before any draw call of a frame in
//!   which the camera or projection changed.
//! - Batches render in registration order, picking pass first.
//! - A batch only touches the GPU through [`GpuBackend`]; the scene context is
//!   the only owner of the backend.

mod backend;
mod batch;
mod camera;
mod cube;
mod headless;
mod matrices;
mod picking;
mod shaders;
mod world;

pub use backend::{
    BufferDesc, BufferHandle, BufferTarget, BufferUsage, FramebufferStatus, GpuBackend, PassDesc,
    PassTarget, ProgramDesc, ProgramHandle, StepMode, UniformDesc, UniformKind, UniformValue,
    VertexArrayDesc, VertexArrayHandle, VertexAttributeDesc, VertexBufferLayout, VertexFormat,
};
pub use batch::{BatchId, RenderBatch};
pub use camera::{CameraInfo, Projection, ScreenConfig};
pub use cube::{CubeAttributes, CubeBatch, CubeBatchConfig, CubeInstances, CubePatch};
pub use headless::{GpuCall, HeadlessBackend};
pub use matrices::{MatrixInfo, WorldMatrices};
pub use picking::{decode_pick_bytes, decode_pick_floats, encode_pick_id};
pub use shaders::CUBE_SHADER;
pub use world::{ResizeEntry, World, WorldConfig};

use cubetext_instancing::InstanceError;

/// Errors raised by the rendering layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no rendering context could be created")]
    MissingContext,
    #[error("missing required capability: {0}")]
    MissingCapability(String),
    #[error("cannot create buffer: {0}")]
    BufferCreation(String),
    #[error("shader '{label}' failed to compile: {log}")]
    ShaderCompile { label: String, log: String },
    #[error("program '{label}' failed to link: {log}")]
    ProgramLink { label: String, log: String },
    #[error("program has no uniform named '{0}'")]
    UnknownUniform(String),
    #[error("world is not attached; attach it before enabling auto-resize")]
    NotAttached,
    #[error("batch '{0}' used before init")]
    NotInitialized(&'static str),
    #[error("unknown GPU handle")]
    UnknownHandle,
    #[error("pixel readback failed: {0}")]
    Readback(String),
    #[error(transparent)]
    Instance(#[from] InstanceError),
}
