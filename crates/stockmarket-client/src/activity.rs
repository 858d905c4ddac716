//! Bounded activity log shown beside the trading screen.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use stockmarket_core::{ActivityKind, ActivityPayload};

/// Number of entries kept before the oldest is evicted.
pub const ACTIVITY_LOG_CAPACITY: usize = 30;

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub message: String,
    pub player_name: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, message: impl Into<String>, player_name: Option<&str>) -> Self {
        Self {
            kind,
            message: message.into(),
            player_name: player_name.map(str::to_string),
            timestamp: Local::now(),
        }
    }

    /// `[HH:MM:SS] NAME: message`, with a leading `*` on the viewer's own lines.
    pub fn format_line(&self, viewer: Option<&str>) -> String {
        let own = viewer.is_some() && self.player_name.as_deref() == viewer;
        let marker = if own { '*' } else { ' ' };
        let time = self.timestamp.format("%H:%M:%S");
        match &self.player_name {
            Some(name) => format!("{marker}[{time}] {name}: {}", self.message),
            None => format!("{marker}[{time}] {}", self.message),
        }
    }
}

impl From<ActivityPayload> for ActivityEntry {
    fn from(payload: ActivityPayload) -> Self {
        Self::new(payload.kind, payload.message, payload.player_name.as_deref())
    }
}

/// FIFO of the most recent activity entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: ActivityEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn add(&mut self, kind: ActivityKind, message: impl Into<String>, player: Option<&str>) {
        self.push(ActivityEntry::new(kind, message, player));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ActivityEntry> {
        self.entries.back()
    }

    /// All entries as display lines, oldest first.
    pub fn render(&self, viewer: Option<&str>) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.format_line(viewer))
            .collect()
    }
}
