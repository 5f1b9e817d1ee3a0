//! Fixed-capacity circular log of raw command lines.

/// Number of lines the ring retains.
pub const HISTORY_CAPACITY: usize = 10;

/// Circular history of raw command lines, recallable by 1-based index.
///
/// Recording past capacity overwrites the oldest entry at that ring slot.
/// Recalled lines are re-executed by the interpreter but deliberately not
/// re-recorded.
#[derive(Debug, Clone)]
pub struct History {
    slots: Vec<Option<String>>,
    recorded: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            recorded: 0,
        }
    }

    /// Store a line at slot `recorded mod capacity`, evicting whatever was
    /// there, and advance the write position.
    pub fn record(&mut self, line: &str) {
        let cap = self.slots.len();
        self.slots[self.recorded % cap] = Some(line.to_string());
        self.recorded += 1;
    }

    /// Look up a line: `n == -1` recalls the most recently recorded one; any
    /// other `n` addresses ring slot `n - 1`. Returns `None` for slots that
    /// are out of range or were never written.
    pub fn recall(&self, n: i32) -> Option<&str> {
        let cap = self.slots.len();
        let slot = if n == -1 {
            if self.recorded == 0 {
                return None;
            }
            (self.recorded - 1) % cap
        } else {
            let slot = usize::try_from(n.checked_sub(1)?).ok()?;
            if slot >= cap {
                return None;
            }
            slot
        };
        self.slots[slot].as_deref()
    }

    /// Number of lines currently retrievable.
    pub fn len(&self) -> usize {
        self.recorded.min(self.slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_by_one_based_index() {
        let mut history = History::new();
        history.record("pwd");
        history.record("ls -l");
        assert_eq!(history.recall(1), Some("pwd"));
        assert_eq!(history.recall(2), Some("ls -l"));
    }

    #[test]
    fn recall_minus_one_returns_most_recent() {
        let mut history = History::new();
        history.record("pwd");
        history.record("ls");
        assert_eq!(history.recall(-1), Some("ls"));
    }

    #[test]
    fn recall_from_empty_history_is_none() {
        let history = History::new();
        assert_eq!(history.recall(-1), None);
        assert_eq!(history.recall(1), None);
    }

    #[test]
    fn out_of_range_indices_are_none() {
        let mut history = History::new();
        history.record("pwd");
        assert_eq!(history.recall(0), None);
        assert_eq!(history.recall(-2), None);
        assert_eq!(history.recall(HISTORY_CAPACITY as i32 + 1), None);
        assert_eq!(history.recall(2), None);
    }

    #[test]
    fn recording_past_capacity_evicts_the_oldest() {
        let mut history = History::new();
        for i in 0..HISTORY_CAPACITY + 1 {
            history.record(&format!("cmd{i}"));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // Slot 1 now holds the line that wrapped around.
        assert_eq!(history.recall(1), Some("cmd10"));
        assert_eq!(history.recall(2), Some("cmd1"));
        assert_eq!(history.recall(-1), Some("cmd10"));
    }

    #[test]
    fn most_recent_survives_wraparound() {
        let mut history = History::with_capacity(3);
        for line in ["a", "b", "c", "d", "e"] {
            history.record(line);
        }
        assert_eq!(history.recall(-1), Some("e"));
        assert_eq!(history.recall(1), Some("d"));
        assert_eq!(history.recall(2), Some("e"));
        assert_eq!(history.recall(3), Some("c"));
    }
}
