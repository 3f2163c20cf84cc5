// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context
/// - Consistent message formatting

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

// ============================================================================
// Operation Logging Macros
// ============================================================================

/// Log the start of a dispatched operation with consistent fields
#[macro_export]
macro_rules! log_op_start {
    ($operation:expr, assignment_id = $assignment_id:expr) => {
        tracing::debug!(
            operation = $operation,
            assignment_id = $assignment_id,
            "Operation started"
        );
    };
    ($operation:expr, class_id = $class_id:expr) => {
        tracing::debug!(
            operation = $operation,
            class_id = $class_id,
            "Operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "Operation started"
        );
    };
}

/// Log successful completion of a dispatched operation
#[macro_export]
macro_rules! log_op_success {
    ($operation:expr, kind = $kind:expr) => {
        tracing::info!(
            operation = $operation,
            outcome_kind = $kind,
            "Operation completed"
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "Operation completed: {}", $msg
        );
    };
}

/// Log operation failures with consistent structure
#[macro_export]
macro_rules! log_op_error {
    ($operation:expr, error = $error:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "Operation failed"
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "Operation failed: {}", $msg
        );
    };
}

/// Log operation warnings with context
#[macro_export]
macro_rules! log_op_warn {
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "Operation warning: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

// ============================================================================
// Subscriber bootstrap
// ============================================================================

/// Initialize logging for the embedding application: console output plus
/// a daily-rotated log file. The returned guard must be kept alive for
/// the file writer to flush.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = if config.console_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true),
        )
    } else {
        None
    };

    let (file_layer, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;
        let file_appender =
            tracing_appender::rolling::daily(&config.log_directory, "numeracy-client.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
