/// Centralized logging macros for actor system
///
/// These macros give every actor the same log shape. They forward to
/// `tracing` under the `actor` target, so the host decides formatting and
/// filtering (`RUST_LOG=actor=debug`).
///
/// Log debug-level message
///
/// # Example
/// ```
/// use actor_runtime::actor_debug;
/// actor_debug!("LinkActor: {:?} → {:?}", "Disconnected", "Connecting");
/// ```
#[macro_export]
macro_rules! actor_debug {
    ($($arg:tt)*) => {
        $crate::__tracing::debug!(target: "actor", $($arg)*)
    };
}

/// Log info-level message
///
/// Use for important state changes and user-facing events
#[macro_export]
macro_rules! actor_info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "actor", $($arg)*)
    };
}

/// Log warning-level message
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! actor_warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!(target: "actor", $($arg)*)
    };
}

/// Log error-level message
#[macro_export]
macro_rules! actor_error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!(target: "actor", $($arg)*)
    };
}
