// SPDX-License-Identifier: MIT

//! Structured log event stream (spec §6.5), layered as a typed, swappable
//! sink over `tracing` — mirrors the teacher's `ActivityLogger<K>` pattern
//! of keeping a typed record independently testable from the log lines
//! `tracing` emits.

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
    Result,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Result => "result",
        }
    }
}

/// One structured event (spec §6.5: "at least timestamp, level, message,
/// optional metadata"). `timestamp` is supplied by the caller, not sampled
/// here, so `EventSink` stays a pure function of its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    pub metadata: HashMap<String, Value>,
}

impl LogEvent {
    pub fn new(timestamp_ms: u64, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            level,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

/// Forwards every event to `tracing`, the way `ActivityLogger` forwards
/// write failures: the production sink, never asserted against directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: LogEvent) {
        match event.level {
            LogLevel::Info => {
                tracing::info!(timestamp_ms = event.timestamp_ms, metadata = ?event.metadata, "{}", event.message)
            }
            LogLevel::Debug => {
                tracing::debug!(timestamp_ms = event.timestamp_ms, metadata = ?event.metadata, "{}", event.message)
            }
            LogLevel::Warn => {
                tracing::warn!(timestamp_ms = event.timestamp_ms, metadata = ?event.metadata, "{}", event.message)
            }
            LogLevel::Error => {
                tracing::error!(timestamp_ms = event.timestamp_ms, metadata = ?event.metadata, "{}", event.message)
            }
            LogLevel::Result => {
                tracing::info!(timestamp_ms = event.timestamp_ms, metadata = ?event.metadata, result = %event.level.as_str(), "{}", event.message)
            }
        }
    }
}

/// Records every event in order, for tests asserting on the event stream
/// itself rather than scraping log lines.
#[derive(Default)]
pub struct RecordingEventSink {
    events: std::sync::Mutex<Vec<LogEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: LogEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}
