//! Reporter trait for host callbacks.
//!
//! The engine reports log lines and ingest progress without being coupled to
//! the embedder's UI or logging setup. Hosts implement [`Reporter`]; anything
//! they need alongside the callbacks (a progress-bar handle, a foreign
//! callback token) lives in the implementor itself.

/// Severity of an engine log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Integer encoding used by hosts bridging to foreign callback
    /// conventions: -1 error, 0 warning, 1 info, 2 debug.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Error => -1,
            Self::Warning => 0,
            Self::Info => 1,
            Self::Debug => 2,
        }
    }
}

/// Host-side sinks for log lines and progress ticks.
///
/// Both methods default to no-ops so an embedder can implement only what it
/// cares about. Callbacks run synchronously on the updating thread and must
/// not block.
pub trait Reporter {
    /// A log line from the engine.
    fn log(&self, _level: LogLevel, _message: &str) {}

    /// Ingest progress: `seen` packages emitted so far out of `expected`
    /// (the root element's `packages` attribute). Only invoked when the
    /// document announced a package count.
    fn progress(&self, _seen: u32, _expected: u32) {}
}

/// Default reporter: forwards log lines to `tracing`, drops progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_encoding() {
        assert_eq!(LogLevel::Error.as_i32(), -1);
        assert_eq!(LogLevel::Warning.as_i32(), 0);
        assert_eq!(LogLevel::Info.as_i32(), 1);
        assert_eq!(LogLevel::Debug.as_i32(), 2);
    }
}
