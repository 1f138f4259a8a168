//! Last-published snapshot.
//!
//! One flat map per scan loop, keyed by the full topic: an entry holds the
//! value last *published* there, so deciding and recording are split —
//! `is_changed` answers "would this publish be redundant", `commit` records
//! only after the broker accepted the message. Sentinel values never reach
//! this layer; callers drop them while building the batch.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Snapshot {
    last: HashMap<String, String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// `true` when the topic was never published or carried another value.
    pub fn is_changed(&self, topic: &str, value: &str) -> bool {
        self.last.get(topic).map(String::as_str) != Some(value)
    }

    pub fn commit(&mut self, topic: &str, value: &str) {
        self.last.insert(topic.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
