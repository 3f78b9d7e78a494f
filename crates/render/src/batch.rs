use crate::RenderError;
use crate::backend::GpuBackend;
use crate::matrices::WorldMatrices;
use cubetext_common::{IdGenerator, InstanceKey};
use std::any::Any;

/// Type tag of a batch. One batch per tag per world.
pub type BatchId = &'static str;

/// A group of instances drawn with one program.
///
/// Lifecycle: constructed uninitialized, then [`RenderBatch::init`] once the
/// world hands it a backend. Every other GPU-touching call needs `init` first.
pub trait RenderBatch: Any {
    fn id(&self) -> BatchId;

    fn init(&mut self, gpu: &mut dyn GpuBackend, ids: IdGenerator) -> Result<(), RenderError>;

    fn is_initialized(&self) -> bool;

    /// Draw all instances. Program state is rebound only when `last` differs
    /// from this batch's id. Returns this batch's id.
    fn render(
        &mut self,
        gpu: &mut dyn GpuBackend,
        matrices: &WorldMatrices,
        last: Option<BatchId>,
        picking: bool,
    ) -> Result<BatchId, RenderError>;

    /// Map a picking id back to the caller's key.
    fn key_for_id(&self, id: u32) -> Option<InstanceKey>;

    fn picked(&mut self, key: InstanceKey);

    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
