//! Injected logging sink.
//!
//! The original implementation reaches for a process-wide logger macro.
//! Here the sink is a collaborator passed in by the caller, so the engine
//! stays free of ambient state and easy to test in isolation.

use std::fmt;

/// Severity of a logged message, mirroring the four levels the Type Engine
/// distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

/// A reentrant-safe sink for diagnostic messages produced while parsing or
/// navigating a type tree.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: fmt::Arguments<'_>);
}

/// Forwards every message to `tracing`, matching how the rest of the stack
/// reports diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: fmt::Arguments<'_>) {
        match level {
            Level::Debug => tracing::debug!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }
    }
}

/// A sink that discards everything. Useful for tests that want to assert on
/// behavior without cluttering output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: fmt::Arguments<'_>) {}
}

macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)*) => {
        $logger.log($level, format_args!($($arg)*))
    };
}

pub(crate) use log;
