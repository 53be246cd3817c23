//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (log through `tracing`, collect in memory, etc.).

use std::sync::{Arc, Mutex};

use crate::events::CollisionEvent;

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &CollisionEvent);

    /// Called at shutdown. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Collects events in a shared `Vec` for testing and inspection.
///
/// The sink is boxed into the bus; keep a clone of [`VecSink::log`] to read
/// what it received.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<CollisionEvent>>>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events.
    pub fn log(&self) -> Arc<Mutex<Vec<CollisionEvent>>> {
        Arc::clone(&self.events)
    }

    /// Snapshot of the collected events.
    pub fn events(&self) -> Vec<CollisionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &CollisionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    /// Creates a new tracing sink at the given log level.
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(tracing::Level::INFO)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &CollisionEvent) {
        // tracing needs the level as a constant at each call site
        let level = self.level;
        if level == tracing::Level::ERROR {
            tracing::error!(pass = event.pass, event = ?event.kind, "collision_event");
        } else if level == tracing::Level::WARN {
            tracing::warn!(pass = event.pass, event = ?event.kind, "collision_event");
        } else if level == tracing::Level::INFO {
            tracing::info!(pass = event.pass, event = ?event.kind, "collision_event");
        } else if level == tracing::Level::DEBUG {
            tracing::debug!(pass = event.pass, event = ?event.kind, "collision_event");
        } else {
            tracing::trace!(pass = event.pass, event = ?event.kind, "collision_event");
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
