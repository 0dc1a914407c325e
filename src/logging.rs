//! Module: logging
//!
//! Purpose: Journal of noteworthy device events destined for the collector.
//!
//! Architecture:
//! - Handlers append one-line messages; the control loop drains at most one
//!   entry per tick to `POST /api/v1/logs/`, so a burst of events never
//!   monopolizes the loop.
//! - The queue is bounded and drops the *oldest* entry when full: during an
//!   outage the newest events are the ones worth keeping.
//! - Development diagnostics use the `log` facade instead; this queue is
//!   only for lines the collector should archive.

use std::collections::VecDeque;

/// Maximum queued uplink messages.
pub const UPLINK_LOG_CAP: usize = 32;

/// Bounded FIFO of pending uplink log lines.
pub struct UplinkLog {
    entries: VecDeque<String>,
    dropped: u32,
}

impl UplinkLog {
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Queue one message, evicting the oldest when full.
    pub fn push(&mut self, message: String) {
        if self.entries.len() >= UPLINK_LOG_CAP {
            self.entries.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        self.entries.push_back(message);
    }

    /// Take the oldest pending message.
    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    /// Put a message back at the front (failed push, retry next tick).
    pub fn requeue(&mut self, message: String) {
        if self.entries.len() < UPLINK_LOG_CAP {
            self.entries.push_front(message);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages evicted unsent since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Default for UplinkLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut log = UplinkLog::new();
        log.push("first".to_string());
        log.push("second".to_string());
        assert_eq!(log.pop().as_deref(), Some("first"));
        assert_eq!(log.pop().as_deref(), Some("second"));
        assert!(log.pop().is_none());
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let mut log = UplinkLog::new();
        for i in 0..UPLINK_LOG_CAP + 3 {
            log.push(format!("msg {i}"));
        }
        assert_eq!(log.len(), UPLINK_LOG_CAP);
        assert_eq!(log.dropped(), 3);
        assert_eq!(log.pop().as_deref(), Some("msg 3"));
    }

    #[test]
    fn test_requeue_front() {
        let mut log = UplinkLog::new();
        log.push("a".to_string());
        log.push("b".to_string());
        let taken = log.pop().unwrap();
        log.requeue(taken);
        assert_eq!(log.pop().as_deref(), Some("a"));
    }
}
