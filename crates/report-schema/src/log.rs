//! Append-only result log shared by the sequential probe and control phases.

/// Ordered, append-only collection of results.
///
/// Entries can only be added at the end and are never replaced, and each
/// source may appear at most once.
#[derive(Debug, Clone)]
pub struct ResultLog<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for ResultLog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ResultLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log with room for `capacity` results.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a result. Returns false, leaving the log untouched, if `source`
    /// already has an entry.
    pub fn append(&mut self, source: impl Into<String>, result: T) -> bool {
        let source = source.into();
        if self.contains(&source) {
            return false;
        }
        self.entries.push((source, result));
        true
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.iter().any(|(s, _)| s == source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the log, yielding the results in append order.
    pub fn into_results(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, result)| result).collect()
    }
}
