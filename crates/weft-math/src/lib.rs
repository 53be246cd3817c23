//! # weft-math
//!
//! Geometric primitives for the weft collision core.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3` as [`Vec3`])
//! - Axis-aligned bounding boxes ([`Aabb`])
//! - Coplanarity times of four linearly moving points (cubic root finding)
//! - Closest-point queries (point-triangle, segment-segment) and barycentrics

pub mod aabb;
pub mod closest;
pub mod roots;

pub use aabb::Aabb;

// Re-export glam's f64 vector as the canonical vector type for weft.
pub use glam::DVec3 as Vec3;
