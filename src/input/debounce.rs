//! Debounced text commit.
//!
//! A single pending handle: each keystroke replaces the pending commit and
//! pushes its deadline out by [`COMMIT_DELAY_MS`]. The host drives time via
//! `poll(now_ms)`.

/// Delay between the last keystroke and the commit.
pub const COMMIT_DELAY_MS: f64 = 20.0;

/// A draft waiting to be written into a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: f64,
    pending: Option<(f64, PendingCommit)>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(COMMIT_DELAY_MS)
    }
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Replace any pending commit.
    pub fn schedule(&mut self, row: usize, col: usize, value: impl Into<String>, now_ms: f64) {
        self.pending = Some((
            now_ms + self.delay_ms,
            PendingCommit {
                row,
                col,
                value: value.into(),
            },
        ));
    }

    /// Take the pending commit once its deadline has passed.
    pub fn poll(&mut self, now_ms: f64) -> Option<PendingCommit> {
        match &self.pending {
            Some((due, _)) if now_ms >= *due => self.pending.take().map(|(_, c)| c),
            _ => None,
        }
    }

    /// Take the pending commit regardless of its deadline.
    pub fn flush(&mut self) -> Option<PendingCommit> {
        self.pending.take().map(|(_, c)| c)
    }

    /// Drop the pending commit; returns whether one was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
