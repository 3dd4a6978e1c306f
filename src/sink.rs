//! Destinations for encoded log events.
//!
//! An [`EventSink`] receives one JSON line per intercepted call. Two sinks ship with the crate,
//! selected by [`SinkKind`] in the configuration; anything else can be plugged in through
//! [`CallLogger::with_sink`](crate::CallLogger::with_sink).

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Target used by [`TracingSink`], so subscribers can route call logs separately.
pub const EVENT_TARGET: &str = "call_logger::event";

/// Receives encoded call log events.
///
/// `emit` runs inline on the task that made the call, after the call has finished. It must not
/// panic; it may be called while a panic is unwinding.
///
/// # Examples
///
/// ```rust
/// use call_logger::EventSink;
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct MemorySink {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl EventSink for MemorySink {
///     fn emit(&self, line: &str) {
///         if let Ok(mut lines) = self.lines.lock() {
///             lines.push(line.to_owned());
///         }
///     }
/// }
/// ```
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, line: &str);
}

impl<K: EventSink + ?Sized> EventSink for Arc<K> {
    fn emit(&self, line: &str) {
        (**self).emit(line)
    }
}

/// Writes each event as an info-level `tracing` event on [`EVENT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: EVENT_TARGET, "{line}");
    }
}

/// Writes each event as a raw JSON line on stderr, bypassing the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl EventSink for StderrSink {
    fn emit(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// The built-in sinks, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Tracing,
    Stderr,
}

impl SinkKind {
    pub fn build(self) -> Arc<dyn EventSink> {
        match self {
            SinkKind::Tracing => Arc::new(TracingSink),
            SinkKind::Stderr => Arc::new(StderrSink),
        }
    }
}
