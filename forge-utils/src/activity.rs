// Vibeforge Activity Log
//
// Rolling, bounded log of pipeline progress and failures. This is the only
// user-visible failure channel: every surfaced error ends up here.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::time::{local_clock, now_millis};

/// Number of entries kept by [`ActivityLog::default`]
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 16;

/// Severity of an activity entry, determining its marker when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStyle {
    /// Progress message
    Info,
    /// Step or operation finished (✓)
    Success,
    /// Tolerated failure (⚠)
    Warning,
    /// Surfaced failure (✗)
    Error,
}

impl ActivityStyle {
    /// Get icon character for this style
    pub fn icon(&self) -> &'static str {
        match self {
            ActivityStyle::Info => "·",
            ActivityStyle::Success => "✓",
            ActivityStyle::Warning => "⚠",
            ActivityStyle::Error => "✗",
        }
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub style: ActivityStyle,
    pub message: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl ActivityEntry {
    pub fn new(style: ActivityStyle, message: String) -> Self {
        Self {
            style,
            message,
            timestamp: now_millis(),
        }
    }

    /// Local time of day, e.g. `14:03:59`
    pub fn clock(&self) -> String {
        local_clock(self.timestamp)
    }
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.clock(), self.style.icon(), self.message)
    }
}

/// Bounded rolling log; the oldest entry is dropped once capacity is reached.
///
/// Shared between the pipeline and whoever renders it, so all methods take
/// `&self`.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ActivityEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: ActivityEntry) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(ActivityEntry::new(ActivityStyle::Info, message.into()));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(ActivityEntry::new(ActivityStyle::Success, message.into()));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(ActivityEntry::new(ActivityStyle::Warning, message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(ActivityEntry::new(ActivityStyle::Error, message.into()));
    }

    /// Drop every entry (a new build starts with a clean log)
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the current entries, oldest first
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<ActivityEntry> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ACTIVITY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, TimeZone};

    #[test]
    fn test_entry_creation() {
        let entry = ActivityEntry::new(ActivityStyle::Error, "Build failed".to_string());
        assert_eq!(entry.style, ActivityStyle::Error);
        assert_eq!(entry.message, "Build failed");
        assert!(entry.timestamp > 0);
        assert!(entry.to_string().ends_with("✗ Build failed"));
    }

    #[test]
    fn test_clock_label_is_local_time() {
        let wall = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        let entry = ActivityEntry {
            style: ActivityStyle::Info,
            message: "Deployed".to_string(),
            timestamp: Local.from_local_datetime(&wall).single().unwrap().timestamp_millis() + 250,
        };
        assert_eq!(entry.clock(), "13:05:09");
        assert_eq!(entry.to_string(), "13:05:09 · Deployed");
    }

    #[test]
    fn test_log_is_bounded() {
        let log = ActivityLog::default();
        for i in 0..40 {
            log.info(format!("step {}", i));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), DEFAULT_ACTIVITY_CAPACITY);
        assert_eq!(entries[0].message, "step 24");
        assert_eq!(log.last().unwrap().message, "step 39");
    }

    #[test]
    fn test_clear() {
        let log = ActivityLog::with_capacity(4);
        log.error("boom");
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 4);
    }

    #[test]
    fn test_zero_capacity_still_keeps_last_entry() {
        let log = ActivityLog::with_capacity(0);
        log.warning("first");
        log.success("second");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().style, ActivityStyle::Success);
    }
}
