use std::collections::VecDeque;

use serde::Serialize;

/// Append-only history of received values.
///
/// Unbounded by default. With a capacity it behaves as a ring buffer and
/// evicts the oldest entry once full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLog<T> {
    #[serde(rename = "entries")]
    entries: VecDeque<T>,
    #[serde(skip)]
    capacity: Option<usize>,
}

impl<T> EventLog<T> {
    pub fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
        }
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    pub fn push(&mut self, entry: T) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T: Clone> EventLog<T> {
    /// Entries oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_log_keeps_everything() {
        let mut log = EventLog::unbounded();
        for n in 0..100 {
            log.push(n);
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next(), Some(&0));
    }

    #[test]
    fn bounded_log_evicts_oldest() {
        let mut log = EventLog::bounded(2);
        log.push("Hello");
        log.push("World");
        log.push("Combine");
        assert_eq!(log.to_vec(), vec!["World", "Combine"]);
    }

    #[test]
    fn serializes_as_entry_list() {
        let mut log = EventLog::with_capacity(None);
        log.push("a".to_string());
        let json = serde_json::to_string(&log).unwrap();
        assert_eq!(json, r#"{"entries":["a"]}"#);
    }
}
