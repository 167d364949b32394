//! Session log: newest-first, bounded.

use std::collections::VecDeque;

/// Maximum number of retained log lines.
pub const LOG_CAPACITY: usize = 200;

/// Append-only log of decision lines, newest first. When full, the oldest
/// line is dropped.
#[derive(Debug, Clone)]
pub struct LogBook {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

impl LogBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_front(line.into());
        self.lines.truncate(self.capacity);
    }

    pub fn newest(&self) -> Option<&str> {
        self.lines.front().map(String::as_str)
    }

    /// All lines, newest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
