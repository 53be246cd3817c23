//! # weft-types
//!
//! Shared types, identifiers, error types, and numerical constants
//! for the weft collision core.
//!
//! This crate has zero domain logic; it defines the vocabulary
//! that all other weft crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{WeftError, WeftResult};
pub use ids::{EdgeId, TriangleId, VertexId};
