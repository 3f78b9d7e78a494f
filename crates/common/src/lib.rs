//! Shared value types and containers used across the cube-text crates.
//!
//! # Invariants
//! - `VectorMap` keeps its storage dense; removal swaps the last entry into the hole.
//! - Keys are the only stable identity. Positions may change on removal.

mod ids;
mod types;
mod vector_map;

pub use ids::IdGenerator;
pub use types::{Color, Coordinate, InstanceKey, SizeConfig};
pub use vector_map::{Removed, VectorMap};
