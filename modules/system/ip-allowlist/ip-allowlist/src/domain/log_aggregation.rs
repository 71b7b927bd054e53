//! Coalescing of per-client "allowed" log lines.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use portal_security::Clock;

#[derive(Debug, Clone, Copy)]
struct LogAggregationEntry {
    suppressed: u64,
    last_logged_at: DateTime<Utc>,
}

/// What the caller should do with an allow event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowLog {
    /// Write a log line; `suppressed` allows were folded into it since the last one.
    Emit { suppressed: u64 },
    /// Inside the window; counted, not logged.
    Suppressed,
}

pub struct AllowLogAggregator {
    window: Duration,
    retention: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, LogAggregationEntry>,
}

impl AllowLogAggregator {
    #[must_use]
    pub fn new(window: Duration, retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            retention,
            clock,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn record(&self, client_ip: &str) -> AllowLog {
        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(client_ip.to_owned())
            .or_insert(LogAggregationEntry {
                suppressed: 0,
                last_logged_at: DateTime::<Utc>::MIN_UTC,
            });

        if now - entry.last_logged_at < self.window {
            entry.suppressed += 1;
            return AllowLog::Suppressed;
        }

        let suppressed = entry.suppressed;
        *entry = LogAggregationEntry {
            suppressed: 0,
            last_logged_at: now,
        };
        AllowLog::Emit { suppressed }
    }

    /// Drop entries whose last log line is older than the retention period.
    /// Returns how many were removed.
    #[must_use]
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now - entry.last_logged_at <= self.retention);
        before.saturating_sub(self.entries.len())
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }
}
