//! Instance buffer management: one growable CPU mirror per named attribute,
//! keyed slots into those mirrors, and minimal uploads through an [`AttributeSink`].
//!
//! # Invariants
//! - A mirror's length is `capacity * stride` where stride is `size` (or `size * size`
//!   for matrix attributes).
//! - A slot's offset is always `position * stride`; removal keeps storage dense by
//!   moving the last slot into the freed one.
//! - Capacity never shrinks.

mod attribute;
mod buffers;

pub use attribute::{Attribute, AttributeDesc, AttributeId, AttributeUsage};
pub use buffers::{AttributeSink, InstanceBuffers, Region, UploadKind};

/// Errors from instance buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("instance key already allocated")]
    DuplicateKey,
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("attribute '{attribute}' expects {expected} values, got {actual}")]
    LengthMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("attribute '{0}' is fixed geometry and has no per-instance slots")]
    FixedAttribute(&'static str),
}
