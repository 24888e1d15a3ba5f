//! Message history tracking for debugging and diagnostics.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde::Serialize;

use crate::message::MessageType;
use crate::types::TargetAddress;

/// Direction of a recorded datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Sent,
    Received,
    /// Received but matched no pending request.
    Ignored,
}

/// A recorded message in the history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub message_type: MessageType,
    pub target: TargetAddress,
    pub sequence: u8,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Bounded log of the datagrams a connection sent and received.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    counts: HashMap<Direction, HashMap<MessageType, usize>>,
    last_error: Option<String>,
    start_time: Instant,
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self {
            counts: HashMap::from([
                (Direction::Sent, HashMap::new()),
                (Direction::Received, HashMap::new()),
                (Direction::Ignored, HashMap::new()),
            ]),
            last_error: None,
            start_time: Instant::now(),
            entries: VecDeque::new(),
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    pub fn record(
        &mut self,
        direction: Direction,
        message_type: MessageType,
        target: TargetAddress,
        sequence: u8,
    ) {
        if let Some(type_map) = self.counts.get_mut(&direction) {
            *type_map.entry(message_type).or_default() += 1;
        }

        if self.max_entries == 0 {
            return;
        }
        self.entries.push_back(HistoryEntry {
            direction,
            message_type,
            target,
            sequence,
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });

        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn record_error(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of datagrams of `message_type` recorded in `direction`.
    pub fn count(&self, direction: Direction, message_type: MessageType) -> usize {
        self.counts
            .get(&direction)
            .and_then(|m| m.get(&message_type))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.values_mut().for_each(|m| m.clear());
        self.entries.clear();
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        let count = |d: Direction| self.counts.get(&d).map_or(0, |m| m.values().sum());
        HistorySummary {
            sent_count: count(Direction::Sent),
            received_count: count(Direction::Received),
            ignored_count: count(Direction::Ignored),
            total_entries: self.entries.len(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Summary of message history for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub sent_count: usize,
    pub received_count: usize,
    pub ignored_count: usize,
    pub total_entries: usize,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_message() {
        let mut history = MessageHistory::new();
        history.record(Direction::Sent, MessageType::GetPower, TargetAddress::BROADCAST, 1);
        history.record(Direction::Received, MessageType::StatePower, TargetAddress::BROADCAST, 1);

        assert_eq!(history.len(), 2);
        assert_eq!(history.count(Direction::Sent, MessageType::GetPower), 1);
        assert_eq!(history.summary().received_count, 1);
    }

    #[test]
    fn test_record_error() {
        let mut history = MessageHistory::new();
        history.record_error("Connection timeout");
        assert_eq!(history.last_error(), Some("Connection timeout"));
        history.clear();
        assert_eq!(history.last_error(), None);
    }

    #[test]
    fn test_max_entries() {
        let mut history = MessageHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(Direction::Sent, MessageType::GetLabel, TargetAddress::BROADCAST, i);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries().next().map(|e| e.sequence), Some(3));
        assert_eq!(history.summary().sent_count, 5);
    }
}
