//! # weft-telemetry
//!
//! Event bus for collision telemetry. Emits structured events (broad-phase
//! rebuilds, candidate counts, confirmed collisions, rejected edits) that
//! can be consumed by pluggable sinks (tracing, in-memory logs, etc.).

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{CollisionEvent, EventKind, RebuildMode};
pub use sinks::{EventSink, TracingSink, VecSink};
