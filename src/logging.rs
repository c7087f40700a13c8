//! # Structured Logging Module
//!
//! `tracing` subscriber setup and structured log helpers for the operations
//! the orchestrator performs.

use crate::config::{LogFormat, LoggingConfig};
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
///
/// `RUST_LOG` takes precedence over `config.level`. If a global subscriber is
/// already installed (embedding application, test harness) it is left in place.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .boxed(),
        };

        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log structured data for eval run operations
pub fn log_eval_run_operation(
    operation: &str,
    eval_run_id: &str,
    agent_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        eval_run_id = %eval_run_id,
        agent_id = agent_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 EVAL_RUN_OPERATION"
    );
}

/// Log structured data for configuration and dataset writes
pub fn log_metadata_operation(
    operation: &str,
    entity: &str,
    entity_id: &str,
    agent_id: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        entity = %entity,
        entity_id = %entity_id,
        agent_id = %agent_id,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 METADATA_OPERATION"
    );
}

/// Log structured data for blob artifact operations
pub fn log_artifact_operation(operation: &str, container: &str, blob_path: &str, status: &str) {
    tracing::info!(
        operation = %operation,
        container = %container,
        blob_path = %blob_path,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 ARTIFACT_OPERATION"
    );
}

/// Record the full backend error server-side before it is sanitized for callers
pub fn log_storage_error(operation: &str, error: &str) {
    tracing::error!(
        operation = %operation,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ STORAGE_ERROR"
    );
}
