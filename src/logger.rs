//! Diagnostic line sink of the bridge.

use std::fmt;

/// Receives the diagnostic lines the bridge produces on each tick.
///
/// Any `Fn(fmt::Arguments<'_>)` closure is a logger:
///
/// ```
/// # use std::sync::Arc;
/// # use sumo_bridge::bridge::Config;
/// let config = Config::new("https://collectors.sumologic.com/receiver/v1/http/abc")
///     .with_logger(Arc::new(|line: std::fmt::Arguments<'_>| eprintln!("{line}")));
/// ```
pub trait Logger: Send + Sync {
    /// Emit one line.
    fn println(&self, args: fmt::Arguments<'_>);
}

impl<F> Logger for F
where
    F: Fn(fmt::Arguments<'_>) + Send + Sync,
{
    fn println(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

/// Forwards every line to [`tracing`] at `INFO` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn println(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "sumo_bridge", "{}", args);
    }
}
