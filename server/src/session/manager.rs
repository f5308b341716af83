//! Session manager - tracks open connections and sink-wide totals

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Sink-wide totals, copied out for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkStats {
    pub active_sessions: usize,
    pub received: u64,
    pub valid: u64,
    pub invalid: u64,
    pub decode_errors: u64,
}

/// Shared by every session task
#[derive(Debug, Default)]
pub struct SessionManager {
    active: AtomicUsize,
    received: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
    decode_errors: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_opened(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn session_closed(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Record the validation outcome of one envelope
    pub fn record(&self, valid: bool) {
        self.received.fetch_add(1, Ordering::SeqCst);
        if valid {
            self.valid.fetch_add(1, Ordering::SeqCst);
        } else {
            self.invalid.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            active_sessions: self.active.load(Ordering::SeqCst),
            received: self.received.load(Ordering::SeqCst),
            valid: self.valid.load(Ordering::SeqCst),
            invalid: self.invalid.load(Ordering::SeqCst),
            decode_errors: self.decode_errors.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let manager = SessionManager::new();
        manager.session_opened();
        manager.record(true);
        manager.record(false);
        manager.record(true);
        manager.record_decode_error();

        assert_eq!(
            manager.stats(),
            SinkStats {
                active_sessions: 1,
                received: 3,
                valid: 2,
                invalid: 1,
                decode_errors: 1,
            }
        );

        manager.session_closed();
        assert_eq!(manager.stats().active_sessions, 0);
    }
}
