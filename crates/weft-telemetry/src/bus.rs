//! Event bus for collision passes.
//!
//! Producers queue events through a `std::sync::mpsc` channel while a pass
//! runs; the owner of the bus drains the queue into its sinks between
//! passes. Emitting only needs `&self`, so a pipeline can report from
//! inside methods that borrow it immutably.

use std::sync::mpsc;

use crate::events::CollisionEvent;
use crate::sinks::EventSink;

/// Queues collision events and fans them out to registered sinks.
pub struct EventBus {
    sender: mpsc::Sender<CollisionEvent>,
    queue: mpsc::Receiver<CollisionEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    enabled: bool,
    dispatched: u64,
}

impl EventBus {
    /// A bus with no sinks.
    pub fn new() -> Self {
        let (sender, queue) = mpsc::channel();
        Self {
            sender,
            queue,
            sinks: Vec::new(),
            enabled: true,
            dispatched: 0,
        }
    }

    /// Registers a sink.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`add_sink`](Self::add_sink).
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// A disabled bus drops everything it is given.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues an event for the next [`flush`](Self::flush).
    pub fn emit(&self, event: CollisionEvent) {
        if self.enabled {
            // The bus owns the receiving end, so the channel is never closed
            let _ = self.sender.send(event);
        }
    }

    /// Hands every queued event to every sink, in emission order.
    ///
    /// Returns the number of events dispatched.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        for event in self.queue.try_iter() {
            for sink in self.sinks.iter_mut() {
                sink.handle(&event);
            }
            count += 1;
        }
        self.dispatched += count as u64;
        count
    }

    /// Drains the queue, then lets each sink close out.
    pub fn finalize(&mut self) {
        self.flush();
        self.sinks.iter_mut().for_each(|sink| sink.finalize());
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Total events dispatched over the bus's lifetime.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sinks: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("EventBus")
            .field("sinks", &sinks)
            .field("enabled", &self.enabled)
            .field("dispatched", &self.dispatched)
            .finish()
    }
}
