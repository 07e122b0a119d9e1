//! Security event records and the bounded in-memory event buffer.
//!
//! # Design Decisions
//! - Append-only, FIFO eviction once `capacity` is reached
//! - Lifetime equals process lifetime; nothing is persisted
//! - Readers get a cloned snapshot, never a reference into the buffer

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of notable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    SuspiciousRequest,
    AdminAccessAttempt,
    AuthFailure,
    SlowRequest,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuspiciousRequest => "SUSPICIOUS_REQUEST",
            Self::AdminAccessAttempt => "ADMIN_ACCESS_ATTEMPT",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::SlowRequest => "SLOW_REQUEST",
        }
    }

    /// Parse the wire name (`SUSPICIOUS_REQUEST`, ...), case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUSPICIOUS_REQUEST" => Some(Self::SuspiciousRequest),
            "ADMIN_ACCESS_ATTEMPT" => Some(Self::AdminAccessAttempt),
            "AUTH_FAILURE" => Some(Self::AuthFailure),
            "SLOW_REQUEST" => Some(Self::SlowRequest),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspicious or notable HTTP request, retained for operator visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Request URL with sensitive query values redacted.
    pub url: String,
    pub ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Wall-clock duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

/// Process-wide bounded event buffer.
#[derive(Debug)]
pub struct SecurityEventLog {
    events: Mutex<VecDeque<SecurityEvent>>,
    capacity: usize,
}

impl SecurityEventLog {
    /// Create an empty buffer holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event, evicting the oldest entries first if the buffer is full.
    pub fn record(&self, event: SecurityEvent) {
        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot of all buffered events, oldest first.
    pub fn snapshot(&self) -> Vec<SecurityEvent> {
        self.lock().iter().cloned().collect()
    }

    /// The newest `limit` events of the given type (or of every type), oldest first.
    pub fn query(&self, event_type: Option<SecurityEventType>, limit: Option<usize>) -> Vec<SecurityEvent> {
        let events = self.lock();
        let mut matched: Vec<SecurityEvent> = events
            .iter()
            .rev()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        matched.reverse();
        matched
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffered event. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut events = self.lock();
        let removed = events.len();
        events.clear();
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SecurityEvent>> {
        // A poisoned buffer still holds valid events; logging must keep working.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
