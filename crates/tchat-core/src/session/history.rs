//! Bounded chat history.

use std::collections::VecDeque;

/// Who wrote a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// One delivered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub sender: String,
    pub content: String,
    /// Milliseconds since the Unix epoch, as stamped by the author.
    pub timestamp: u64,
    pub origin: Origin,
}

/// Time-ordered ring of the most recent chat lines.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    lines: VecDeque<ChatLine>,
    limit: usize,
}

impl ChatHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(limit.min(1024)),
            limit,
        }
    }

    /// Append, evicting the oldest line when full.
    pub fn push(&mut self, line: ChatLine) {
        if self.limit == 0 {
            return;
        }
        while self.lines.len() >= self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// The last `n` lines, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatLine> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ChatLine> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
