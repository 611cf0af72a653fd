//! Tracing and profiling utilities.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate, and the
//! `profiling` feature for `puffin` scopes. These macros no-op when the feature is
//! disabled. The feature must be enabled on the calling crate as well, which is
//! why every workspace crate forwards it.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// tessel_trace_query!(&sql, params.len());
/// ```
#[macro_export]
macro_rules! tessel_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(sql = %$sql, params = $param_count, "tessel.query");
    };
}

/// Emit an info-level tracing event for transaction lifecycle (begin, commit, rollback).
///
/// ```ignore
/// tessel_trace_tx!("begin", "sqlite.rusqlite");
/// ```
#[macro_export]
macro_rules! tessel_trace_tx {
    ($event:literal, $driver:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(event = $event, driver = $driver, "tessel.transaction");
    };
}

/// Emit a warn-level event for recoverable metadata or value-shape irregularities.
#[macro_export]
macro_rules! tessel_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)+);
    };
}

/// Puffin scope around a planning or rendering step.
#[macro_export]
macro_rules! tessel_profile_scope {
    ($category:literal, $operation:literal) => {
        #[cfg(feature = "profiling")]
        ::puffin::profile_scope!($category, $operation);
    };
}
