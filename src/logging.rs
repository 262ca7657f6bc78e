//! Logging and tracing utilities for the provider.
//!
//! All logs are written to **stderr**: stdout carries the go-plugin
//! handshake line and nothing else. Terraform forwards a plugin's stderr
//! into its own log, so provider logs show up under `TF_LOG`.
//!
//! # Environment Variables
//!
//! The filter is taken from the first of these that is set:
//!
//! - `RUST_LOG`: a full `tracing` filter (e.g. `terraform_provider_petstore=debug`)
//! - `TF_LOG_PROVIDER`: a Terraform log level for providers only
//! - `TF_LOG`: the global Terraform log level
//!
//! Terraform levels (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`, `JSON`) are
//! mapped onto `tracing` levels; `JSON` means trace. Anything else falls back
//! to `info`.
//!
//! # Examples
//!
//! ```bash
//! # Show debug logs for this provider during an apply
//! TF_LOG_PROVIDER=DEBUG terraform apply
//!
//! # Show trace logs, including Petstore HTTP responses
//! RUST_LOG=terraform_provider_petstore=trace terraform apply
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// Translate a Terraform log level into a `tracing` filter directive.
fn terraform_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        "OFF" => Some("off"),
        _ => None,
    }
}

/// Pick the filter directive from the log environment.
pub fn filter_directive(
    rust_log: Option<&str>,
    tf_log_provider: Option<&str>,
    tf_log: Option<&str>,
) -> String {
    if let Some(directive) = rust_log.filter(|v| !v.trim().is_empty()) {
        return directive.to_string();
    }
    [tf_log_provider, tf_log]
        .into_iter()
        .flatten()
        .find_map(terraform_level)
        .unwrap_or(DEFAULT_DIRECTIVE)
        .to_string()
}

fn env_filter() -> EnvFilter {
    let var = |name| std::env::var(name).ok();
    let directive = filter_directive(
        var("RUST_LOG").as_deref(),
        var("TF_LOG_PROVIDER").as_deref(),
        var("TF_LOG").as_deref(),
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry().with(env_filter()).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    subscriber().init();
}
