//! Desired-topic bookkeeping.
//!
//! The registry is the source of truth for what the application wants to
//! receive. It outlives any single connection: every time the transport
//! reaches `Open`, [`SubscriptionRegistry::replay`] yields one subscribe frame
//! per desired topic so the server-side view is rebuilt after a reconnect.

use crate::types::OutboundFrame;

/// Deduplicated set of topics, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    topics: Vec<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a topic. Returns `false` if it was already desired.
    pub fn insert(&mut self, topic: &str) -> bool {
        if self.contains(topic) {
            return false;
        }
        self.topics.push(topic.to_string());
        true
    }

    /// Removes a topic. Returns `false` if it was not desired.
    pub fn remove(&mut self, topic: &str) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| t != topic);
        self.topics.len() != before
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Subscribe frames for every desired topic, in insertion order
    pub fn replay(&self) -> Vec<OutboundFrame> {
        self.topics
            .iter()
            .map(|topic| OutboundFrame::subscribe(topic))
            .collect()
    }
}
