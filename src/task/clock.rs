//! Human-readable timestamps for titles and completion lines.

use chrono::{FixedOffset, Local, Utc};

/// Format used for creation and completion timestamps (`14.10.2026 09:30`).
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Source of the current timestamp string.
pub trait Clock: Send + Sync {
    fn now_string(&self) -> String;
}

/// Wall clock, in server local time unless a fixed offset is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new(offset: Option<FixedOffset>) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now_string(&self) -> String {
        match self.offset {
            Some(offset) => Utc::now()
                .with_timezone(&offset)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            None => Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl Clock for FixedClock {
    fn now_string(&self) -> String {
        self.0.clone()
    }
}
