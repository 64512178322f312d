//! Injected logging collaborator.
//!
//! Every component that reports diagnostics receives a [`Logger`] at
//! construction instead of reaching for a per-type static logger. A logger
//! owns a target (e.g. `proxima::database`) and a sink, which is either the
//! process-wide `log` facade, a caller supplied [`log::Log`] implementation,
//! or nothing at all.

use std::fmt::{Arguments, Debug, Formatter};
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

#[derive(Clone)]
enum LogSink {
    Facade,
    Custom(Arc<dyn Log>),
    Silent,
}

/// Handle to a logging sink bound to a target name.
///
/// Cloning is cheap; children created with [`Logger::child`] share the sink.
///
/// # Examples
///
/// ```rust
/// use proxima::common::Logger;
///
/// let logger = Logger::new("proxima::example");
/// let child = logger.child("rtree");
/// assert_eq!(child.target(), "proxima::example::rtree");
/// child.debug(format_args!("split node {}", 3));
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    target: String,
    sink: LogSink,
}

impl Logger {
    /// Creates a logger that forwards to the `log` facade.
    pub fn new(target: &str) -> Self {
        Self::with_sink_internal(target, LogSink::Facade)
    }

    /// Creates a logger that forwards to the given sink.
    pub fn with_sink(target: &str, sink: Arc<dyn Log>) -> Self {
        Self::with_sink_internal(target, LogSink::Custom(sink))
    }

    /// Creates a logger that discards everything.
    pub fn silent() -> Self {
        Self::with_sink_internal("proxima", LogSink::Silent)
    }

    fn with_sink_internal(target: &str, sink: LogSink) -> Self {
        Logger {
            inner: Arc::new(LoggerInner {
                target: target.to_string(),
                sink,
            }),
        }
    }

    /// Derives a logger for a sub component sharing this logger's sink.
    pub fn child(&self, component: &str) -> Logger {
        Self::with_sink_internal(
            &format!("{}::{}", self.inner.target, component),
            self.inner.sink.clone(),
        )
    }

    pub fn target(&self) -> &str {
        &self.inner.target
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        let metadata = Metadata::builder()
            .level(level)
            .target(&self.inner.target)
            .build();
        match &self.inner.sink {
            LogSink::Facade => level <= log::max_level() && log::logger().enabled(&metadata),
            LogSink::Custom(sink) => sink.enabled(&metadata),
            LogSink::Silent => false,
        }
    }

    pub fn log(&self, level: Level, args: Arguments<'_>) {
        if !self.is_enabled(level) {
            return;
        }
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(&self.inner.target)
            .build();
        match &self.inner.sink {
            LogSink::Facade => log::logger().log(&record),
            LogSink::Custom(sink) => sink.log(&record),
            LogSink::Silent => {}
        }
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.log(Level::Error, args)
    }

    pub fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args)
    }

    pub fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    pub fn trace(&self, args: Arguments<'_>) {
        self.log(Level::Trace, args)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new("proxima")
    }
}

impl Debug for Logger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.inner.target)
            .finish()
    }
}
