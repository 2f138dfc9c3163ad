//! Bounded command history with a navigation cursor.

use std::collections::VecDeque;

/// Ordered record of raw command lines, oldest first, bounded by a
/// maximum count with FIFO eviction.
///
/// The cursor supports up/down-arrow navigation: `None` means "at the
/// tail" (no entry selected). Any push resets it.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<String>,
    max: usize,
    cursor: Option<usize>,
}

impl HistoryLog {
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max,
            cursor: None,
        }
    }

    /// Append an entry, evicting the oldest when the bound is reached.
    /// A bound of zero disables recording entirely.
    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        if self.max == 0 {
            return;
        }
        while self.entries.len() >= self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    /// Change the bound, evicting oldest entries if it shrank.
    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        while self.entries.len() > self.max {
            self.entries.pop_front();
        }
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Move the cursor one entry back (up arrow). From the tail or the
    /// oldest entry this wraps to the most recent one.
    pub fn prev(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.cursor {
            None | Some(0) => self.entries.len() - 1,
            Some(i) => i - 1,
        };
        self.cursor = Some(next);
        self.entries.get(next).map(String::as_str)
    }

    /// Move the cursor one entry forward (down arrow). Walking past the
    /// most recent entry returns `None` and resets to the tail.
    pub fn next_entry(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(i + 1);
        self.entries.get(i + 1).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate_in_order() {
        let mut log = HistoryLog::new(10);
        log.push("first");
        log.push("second");
        let all: Vec<&str> = log.entries().collect();
        assert_eq!(all, vec!["first", "second"]);
    }

    #[test]
    fn fifo_eviction_at_bound() {
        let mut log = HistoryLog::new(3);
        for line in ["a", "b", "c", "d"] {
            log.push(line);
        }
        let all: Vec<&str> = log.entries().collect();
        assert_eq!(all, vec!["b", "c", "d"]);
    }

    #[test]
    fn zero_bound_disables_recording() {
        let mut log = HistoryLog::new(0);
        log.push("a");
        assert!(log.is_empty());
    }

    #[test]
    fn shrinking_max_evicts_oldest() {
        let mut log = HistoryLog::new(5);
        for line in ["a", "b", "c", "d"] {
            log.push(line);
        }
        log.set_max(2);
        let all: Vec<&str> = log.entries().collect();
        assert_eq!(all, vec!["c", "d"]);
    }

    #[test]
    fn prev_walks_backward_and_wraps() {
        let mut log = HistoryLog::new(10);
        log.push("a");
        log.push("b");
        log.push("c");
        assert_eq!(log.prev(), Some("c"));
        assert_eq!(log.prev(), Some("b"));
        assert_eq!(log.prev(), Some("a"));
        // From the oldest entry, up wraps to the most recent.
        assert_eq!(log.prev(), Some("c"));
    }

    #[test]
    fn next_walks_forward_and_clears_past_tail() {
        let mut log = HistoryLog::new(10);
        log.push("a");
        log.push("b");
        log.push("c");
        log.prev();
        log.prev();
        assert_eq!(log.next_entry(), Some("c"));
        assert_eq!(log.next_entry(), None);
        // Cursor reset: up starts from the most recent again.
        assert_eq!(log.prev(), Some("c"));
    }

    #[test]
    fn next_at_tail_is_none() {
        let mut log = HistoryLog::new(10);
        log.push("a");
        assert_eq!(log.next_entry(), None);
    }

    #[test]
    fn push_resets_cursor() {
        let mut log = HistoryLog::new(10);
        log.push("a");
        log.push("b");
        log.prev();
        log.prev();
        log.push("c");
        assert_eq!(log.prev(), Some("c"));
    }
}
