//! wgpu backend for the cube-text renderer.
//!
//! Every program is built twice: once for the visible surface with alpha
//! blending, once for the RGBA8 picking target without blending. Passes are
//! recorded and submitted when they end, so uniform writes made between two
//! passes apply to the second one only.
//!
//! # Invariants
//! - Buffer handles survive re-specification; vertex arrays resolve them at
//!   draw time.
//! - Readback coordinates arrive bottom-left and are flipped to the texture's
//!   top-left origin here.

mod backend;
mod targets;
mod uniforms;

pub use backend::WgpuBackend;
pub use targets::{DEPTH_FORMAT, PICKING_FORMAT};
