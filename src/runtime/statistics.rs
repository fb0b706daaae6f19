//! Per-instance message and record counters.

use serde::{Deserialize, Serialize};

/// Counters kept by one component instance.
///
/// An instance processes its stream sequentially, so plain integers suffice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatistics {
    pub messages_received: u64,
    pub messages_forwarded: u64,
    pub entities_processed: u64,
}

impl ComponentStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_received(&mut self) {
        self.messages_received += 1;
    }

    pub fn inc_forwarded(&mut self) {
        self.messages_forwarded += 1;
    }

    pub fn inc_entities_processed(&mut self, count: usize) {
        self.entities_processed += count as u64;
    }
}
