//! Bounded error record surfaced in `panel_status` frames.

use heapless::{String, Vec};
use log::warn;

/// Capacity of the ledger; appends beyond it are dropped until a clear.
pub const MAX_ERRORS: usize = 8;

const ENTRY_LEN: usize = 64;

/// Ordered record of recent error strings.
///
/// Appends are FIFO up to capacity and a no-op once full, so the oldest
/// errors survive a burst. Cleared on successful Wi-Fi re-association or
/// after a config apply with zero failures.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    entries: Vec<String<ENTRY_LEN>, MAX_ERRORS>,
}

impl ErrorLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record an error, truncating to the entry bound. Dropped when full.
    pub fn push(&mut self, message: &str) {
        warn!("panel error: {message}");
        let _ = self.entries.push(crate::config::bounded(message));
    }

    /// Drop every recorded error.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded errors, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.as_str())
    }
}
