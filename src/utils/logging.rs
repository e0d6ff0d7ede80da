//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the ClubHub application.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::{ClubHubError, Result};

/// Target used for security-relevant rejections so they can be routed separately
pub const SECURITY_TARGET: &str = "clubhub::security";

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held by `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "clubhub.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| ClubHubError::Config(format!("Invalid log filter: {}", e)))?;

    let json_stdout = config.json.then(|| fmt::layer().json().with_writer(std::io::stdout));
    let text_stdout = (!config.json).then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_stdout)
        .with(text_stdout)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| ClubHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event management actions
pub fn log_event_action(event_id: Uuid, action: &str, user_id: Uuid, details: Option<&str>) {
    info!(
        event_id = %event_id,
        action = action,
        user_id = %user_id,
        details = details,
        "Event action performed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: Uuid, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = %admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log an attendance transition
pub fn log_attendance(event_id: Uuid, student_id: Uuid, leader_id: Uuid) {
    info!(
        event_id = %event_id,
        student_id = %student_id,
        leader_id = %leader_id,
        "Attendance marked"
    );
}

/// Log payment lifecycle steps
pub fn log_payment_event(order_id: &str, student_id: Uuid, event_id: Uuid, step: &str) {
    info!(
        order_id = order_id,
        student_id = %student_id,
        event_id = %event_id,
        step = step,
        "Payment event"
    );
}

/// Log security-relevant rejections (bad signatures, forged QR codes)
pub fn log_security_rejection(kind: &str, user_id: Uuid, details: Option<&str>) {
    warn!(
        target: SECURITY_TARGET,
        kind = kind,
        user_id = %user_id,
        details = details,
        "Security rejection"
    );
}

/// Log collaborator errors with context before they are mapped for the caller
pub fn log_upstream_error(service: &str, error: &str, context: Option<&str>) {
    error!(
        service = service,
        error = error,
        context = context,
        "Upstream error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
